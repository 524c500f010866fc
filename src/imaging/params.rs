//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the pixel work.
//!
//! ## Types
//!
//! - [`Dpi`]: Output resolution, floored at 72.
//! - [`ResizeFactor`]: Scale factor, clamped to `0.1..=8.0`.
//! - [`AutocropParams`]: Alpha threshold, padding, optional stable search.
//! - [`PostprocessParams`]: Autocrop → longest-edge resize → PNG with metadata.
//! - [`ResizeParams`]: Factor resize → PNG with metadata.
//! - [`ArgumentError`]: Rejected numeric input such as a zero target.

use thiserror::Error;

/// An argument outside the range an operation accepts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelLength { expected: usize, actual: usize },
    #[error("resize factor must be finite and positive, got {0}")]
    InvalidFactor(f64),
    #[error("target dimension must be positive")]
    ZeroTarget,
    #[error("at least one of target width or height is required")]
    MissingTarget,
    #[error("crop box {left},{top}..{right},{bottom} is outside a {width}x{height} image")]
    BoxOutOfBounds {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        width: u32,
        height: u32,
    },
}

/// Output resolution in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpi(pub f64);

impl Dpi {
    /// Lowest DPI the pipelines will stamp.
    pub const MIN: f64 = 72.0;

    /// Floors to [`Dpi::MIN`] and drops the fractional part. Non-finite
    /// values fall back to the default.
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self(value.floor().max(Self::MIN))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Self(300.0)
    }
}

/// Scale factor for factor-based resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeFactor(pub f64);

impl ResizeFactor {
    pub const MIN: f64 = 0.1;
    pub const MAX: f64 = 8.0;

    /// Clamps into `MIN..=MAX`. Non-finite values fall back to the default.
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ResizeFactor {
    fn default() -> Self {
        Self(2.0)
    }
}

/// Multi-threshold bounds search: try each threshold, drop boxes covering
/// less than `min_ratio` of the frame, keep the smallest survivor.
#[derive(Debug, Clone, PartialEq)]
pub struct StableSearch {
    pub thresholds: Vec<u8>,
    pub min_ratio: f64,
}

impl Default for StableSearch {
    fn default() -> Self {
        Self {
            thresholds: vec![10, 50, 128, 200],
            min_ratio: 0.1,
        }
    }
}

/// How to trim transparent margins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutocropParams {
    /// Pixels with alpha strictly greater than this count as content.
    pub alpha_threshold: u8,
    /// Extra margin kept around the content; negative is treated as zero.
    pub padding: i64,
    /// When set, replaces the single-threshold search.
    pub stable: Option<StableSearch>,
}

/// Autocrop, fit the longest edge, then encode with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessParams {
    pub autocrop: AutocropParams,
    pub max_dimension: u32,
    pub allow_upscale: bool,
    pub dpi: Dpi,
    pub software: String,
}

/// Scale by a factor, then encode with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub factor: ResizeFactor,
    pub dpi: Dpi,
    pub software: String,
}
