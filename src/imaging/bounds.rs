//! Alpha-channel bounding boxes and cropping.
//!
//! All functions here are pure and work on caller-owned [`Bitmap`]s; none of
//! them keeps a reference past return.
//!
//! "No content" (every pixel at or below the threshold) is not an error: it
//! is `None` from [`find_bounds`] and [`CropPlan::NoContent`] from
//! [`plan_autocrop`], and means "leave the image alone".

use super::bitmap::Bitmap;
use super::params::{ArgumentError, StableSearch};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    /// The box covering a whole `width` x `height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width.saturating_sub(1),
            bottom: height.saturating_sub(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_full_frame(&self, width: u32, height: u32) -> bool {
        *self == Self::full_frame(width, height)
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.left <= self.right && self.top <= self.bottom && self.right < width && self.bottom < height
    }
}

/// Smallest box enclosing every pixel with `alpha > threshold`.
///
/// Returns `None` when no pixel qualifies.
pub fn find_bounds(bitmap: &Bitmap, threshold: u8) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;

    for (y, row) in bitmap.pixels().chunks_exact(bitmap.stride()).enumerate() {
        let Some(first) = row.chunks_exact(4).position(|px| px[3] > threshold) else {
            continue;
        };
        let last = row
            .chunks_exact(4)
            .rposition(|px| px[3] > threshold)
            .unwrap_or(first);
        let (y, first, last) = (y as u32, first as u32, last as u32);

        bounds = Some(match bounds {
            None => BoundingBox {
                left: first,
                top: y,
                right: last,
                bottom: y,
            },
            Some(b) => BoundingBox {
                left: b.left.min(first),
                top: b.top,
                right: b.right.max(last),
                bottom: y,
            },
        });
    }

    bounds
}

/// Grow `bbox` by `padding` on every side, clamped to the frame.
///
/// Negative padding is treated as zero.
pub fn apply_padding(bbox: BoundingBox, padding: i64, width: u32, height: u32) -> BoundingBox {
    let pad = padding.clamp(0, u32::MAX as i64) as u32;
    BoundingBox {
        left: bbox.left.saturating_sub(pad),
        top: bbox.top.saturating_sub(pad),
        right: bbox.right.saturating_add(pad).min(width.saturating_sub(1)),
        bottom: bbox.bottom.saturating_add(pad).min(height.saturating_sub(1)),
    }
}

/// Copy the pixels inside `bbox` into a new bitmap.
pub fn crop(bitmap: &Bitmap, bbox: BoundingBox) -> Result<Bitmap, ArgumentError> {
    let (width, height) = bitmap.dimensions();
    if !bbox.fits(width, height) {
        return Err(ArgumentError::BoxOutOfBounds {
            left: bbox.left,
            top: bbox.top,
            right: bbox.right,
            bottom: bbox.bottom,
            width,
            height,
        });
    }

    let stride = bitmap.stride();
    let x0 = bbox.left as usize * 4;
    let x1 = (bbox.right as usize + 1) * 4;
    let mut pixels = Vec::with_capacity(bbox.area() as usize * 4);
    for row in bitmap
        .pixels()
        .chunks_exact(stride)
        .skip(bbox.top as usize)
        .take(bbox.height() as usize)
    {
        pixels.extend_from_slice(&row[x0..x1]);
    }

    Bitmap::new(bbox.width(), bbox.height(), pixels)
}

/// Like [`find_bounds`], but tries several thresholds and keeps the
/// smallest box that still covers at least `min_ratio` of the frame.
///
/// Boxes smaller than that are treated as noise. Ties keep the earlier
/// threshold. `None` when no threshold yields an acceptable box.
pub fn find_stable_bounds(bitmap: &Bitmap, search: &StableSearch) -> Option<BoundingBox> {
    let (width, height) = bitmap.dimensions();
    let total = width as f64 * height as f64;

    let mut best: Option<BoundingBox> = None;
    for &threshold in &search.thresholds {
        let Some(bbox) = find_bounds(bitmap, threshold) else {
            continue;
        };
        if (bbox.area() as f64) / total < search.min_ratio {
            debug!(threshold, ?bbox, "stable search: box below min ratio");
            continue;
        }
        if best.is_none_or(|b| bbox.area() < b.area()) {
            debug!(threshold, ?bbox, "stable search: new best");
            best = Some(bbox);
        }
    }
    best
}

/// What an autocrop should do to a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPlan {
    /// No pixel qualifies; leave the image unmodified.
    NoContent,
    /// Content already fills the frame and no padding was asked for.
    FullFrame(BoundingBox),
    /// Crop to this box.
    Crop(BoundingBox),
}

impl CropPlan {
    /// The box that ends up in the output, in source coordinates.
    pub fn bounds(&self, width: u32, height: u32) -> BoundingBox {
        match *self {
            CropPlan::NoContent => BoundingBox::full_frame(width, height),
            CropPlan::FullFrame(b) | CropPlan::Crop(b) => b,
        }
    }

    pub fn needs_crop(&self) -> bool {
        matches!(self, CropPlan::Crop(_))
    }
}

/// Decide how to crop from precomputed content bounds.
pub fn plan_from_bounds(
    bounds: Option<BoundingBox>,
    padding: i64,
    width: u32,
    height: u32,
) -> CropPlan {
    match bounds {
        None => CropPlan::NoContent,
        Some(b) if padding <= 0 && b.is_full_frame(width, height) => CropPlan::FullFrame(b),
        Some(b) => CropPlan::Crop(apply_padding(b, padding, width, height)),
    }
}

/// Find content bounds at `threshold` and plan the crop.
pub fn plan_autocrop(bitmap: &Bitmap, threshold: u8, padding: i64) -> CropPlan {
    let (width, height) = bitmap.dimensions();
    plan_from_bounds(find_bounds(bitmap, threshold), padding, width, height)
}
