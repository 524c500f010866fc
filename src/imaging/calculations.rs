//! Pure calculation functions for resize targets.
//!
//! All functions here are pure and testable without any I/O or images. They
//! only decide integer output dimensions; resampling is the backend's job.
//!
//! Every scaled edge is `max(1, round(edge * scale))` with `f64::round`
//! (half away from zero), so all call sites agree on `.5` ties.

use super::params::ArgumentError;
use tracing::debug;

/// Factors this close to 1 are treated as "no resize".
const IDENTITY_EPSILON: f64 = 1e-6;

/// Planned output size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    /// Output/input ratio actually used (1.0 when unchanged).
    pub scale: f64,
    /// False when the output equals the input and resampling can be skipped.
    pub resized: bool,
}

impl ResizePlan {
    fn unchanged(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            resized: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), ArgumentError> {
    if width == 0 || height == 0 {
        return Err(ArgumentError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Scale one edge, rounding half away from zero, never below 1 pixel.
fn scale_edge(edge: u32, scale: f64) -> u32 {
    // `as` saturates at u32::MAX.
    (edge as f64 * scale).round().max(1.0) as u32
}

/// Fit the longer edge to `target`, preserving aspect ratio.
///
/// Without `allow_upscale`, images whose longer edge is already at or below
/// `target` come back unchanged with scale 1. With it, the longer edge is
/// always made exactly `target` (unless it already is).
///
/// # Examples
/// ```
/// # use pngtrim::imaging::plan_max_dimension;
/// let plan = plan_max_dimension(4000, 2000, 2048, false).unwrap();
/// assert_eq!((plan.width, plan.height, plan.scale), (2048, 1024, 0.512));
/// ```
pub fn plan_max_dimension(
    width: u32,
    height: u32,
    target: u32,
    allow_upscale: bool,
) -> Result<ResizePlan, ArgumentError> {
    check_dimensions(width, height)?;
    if target == 0 {
        return Err(ArgumentError::ZeroTarget);
    }

    let longest = width.max(height);
    let should_resize = if allow_upscale {
        longest != target
    } else {
        longest > target
    };
    if !should_resize {
        return Ok(ResizePlan::unchanged(width, height));
    }

    let scale = target as f64 / longest as f64;
    let plan = ResizePlan {
        width: scale_edge(width, scale),
        height: scale_edge(height, scale),
        scale,
        resized: true,
    };
    debug!(width, height, target, ?plan, "planned longest-edge resize");
    Ok(plan)
}

/// Scale both edges by `factor`. A factor too small to change either
/// rounded edge plans no resize.
///
/// # Examples
/// ```
/// # use pngtrim::imaging::plan_factor;
/// assert_eq!(plan_factor(100, 200, 2.0).unwrap().dimensions(), (200, 400));
/// assert_eq!(plan_factor(100, 200, 1.0000001).unwrap().dimensions(), (100, 200));
/// ```
pub fn plan_factor(width: u32, height: u32, factor: f64) -> Result<ResizePlan, ArgumentError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ArgumentError::InvalidFactor(factor));
    }
    check_dimensions(width, height)?;

    if (factor - 1.0).abs() < IDENTITY_EPSILON {
        return Ok(ResizePlan::unchanged(width, height));
    }

    let (w, h) = (scale_edge(width, factor), scale_edge(height, factor));
    if (w, h) == (width, height) {
        return Ok(ResizePlan::unchanged(width, height));
    }
    Ok(ResizePlan {
        width: w,
        height: h,
        scale: factor,
        resized: true,
    })
}

/// Resize to an explicit width and/or height.
///
/// With only one target, the other edge follows the original aspect ratio.
/// `scale` is `target_width / width` when a width is given, otherwise
/// `target_height / height`.
pub fn plan_explicit_size(
    width: u32,
    height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> Result<ResizePlan, ArgumentError> {
    check_dimensions(width, height)?;
    if target_width == Some(0) || target_height == Some(0) {
        return Err(ArgumentError::ZeroTarget);
    }

    let (w, h, scale) = match (target_width, target_height) {
        (Some(tw), Some(th)) => (tw, th, tw as f64 / width as f64),
        (Some(tw), None) => {
            let scale = tw as f64 / width as f64;
            (tw, scale_edge(height, scale), scale)
        }
        (None, Some(th)) => {
            let scale = th as f64 / height as f64;
            (scale_edge(width, scale), th, scale)
        }
        (None, None) => return Err(ArgumentError::MissingTarget),
    };

    if (w, h) == (width, height) {
        return Ok(ResizePlan::unchanged(width, height));
    }
    Ok(ResizePlan {
        width: w,
        height: h,
        scale,
        resized: true,
    })
}
