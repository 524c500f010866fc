//! High-level image operations.
//!
//! These functions combine calculations with backend execution: decode the
//! source, plan a crop and/or resize with the pure functions in
//! [`bounds`](super::bounds) and [`calculations`](super::calculations), let
//! the backend do the pixel work, then stamp resolution and software
//! metadata onto the encoded PNG.

use super::backend::{BackendError, ImageBackend};
use super::bitmap::Bitmap;
use super::bounds::{
    BoundingBox, CropPlan, crop, find_stable_bounds, plan_autocrop, plan_from_bounds,
};
use super::calculations::{ResizePlan, plan_factor, plan_max_dimension};
use super::params::{AutocropParams, Dpi, PostprocessParams, ResizeParams};
use crate::png;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// An encoded PNG plus what was done to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Kept region in source coordinates; the full frame when nothing was cut.
    pub bounds: BoundingBox,
    /// Size after cropping, before resizing.
    pub cropped_size: (u32, u32),
    pub was_cropped: bool,
    pub was_resized: bool,
    pub scale: f64,
}

/// Encode `bitmap` as PNG, then set its `pHYs` to `dpi` on both axes and its
/// `Software` text to `software`.
pub fn encode_png_with_metadata(
    backend: &impl ImageBackend,
    bitmap: &Bitmap,
    dpi: Dpi,
    software: &str,
) -> Result<Vec<u8>> {
    let encoded = backend.encode_png(bitmap)?;
    let with_dpi = png::set_dpi(&encoded, dpi.value())?;
    Ok(png::set_software_tag(&with_dpi, software)?)
}

/// Plan the crop for `bitmap`, using the stable search when configured.
pub fn plan_crop(bitmap: &Bitmap, params: &AutocropParams) -> CropPlan {
    let (width, height) = bitmap.dimensions();
    match &params.stable {
        Some(search) => plan_from_bounds(
            find_stable_bounds(bitmap, search),
            params.padding,
            width,
            height,
        ),
        None => plan_autocrop(bitmap, params.alpha_threshold, params.padding),
    }
}

/// Trim transparent margins. Returns the (possibly unchanged) bitmap and
/// the plan that was applied.
pub fn autocrop_bitmap(bitmap: Bitmap, params: &AutocropParams) -> Result<(Bitmap, CropPlan)> {
    let plan = plan_crop(&bitmap, params);
    debug!(?plan, "autocrop plan");
    match plan {
        CropPlan::Crop(bbox) => Ok((crop(&bitmap, bbox)?, plan)),
        CropPlan::NoContent | CropPlan::FullFrame(_) => Ok((bitmap, plan)),
    }
}

/// Resample according to `plan`, skipping the backend when nothing changes.
fn apply_resize(backend: &impl ImageBackend, bitmap: Bitmap, plan: &ResizePlan) -> Result<Bitmap> {
    if !plan.resized {
        return Ok(bitmap);
    }
    backend.resize(&bitmap, plan.width, plan.height)
}

struct Stages {
    bounds: BoundingBox,
    cropped_size: (u32, u32),
    was_cropped: bool,
    plan: ResizePlan,
}

fn finish(
    backend: &impl ImageBackend,
    bitmap: Bitmap,
    stages: Stages,
    dpi: Dpi,
    software: &str,
) -> Result<ProcessedImage> {
    let bitmap = apply_resize(backend, bitmap, &stages.plan)?;
    let png = encode_png_with_metadata(backend, &bitmap, dpi, software)?;
    Ok(ProcessedImage {
        png,
        width: bitmap.width(),
        height: bitmap.height(),
        bounds: stages.bounds,
        cropped_size: stages.cropped_size,
        was_cropped: stages.was_cropped,
        was_resized: stages.plan.resized,
        scale: stages.plan.scale,
    })
}

/// Autocrop, fit the longest edge to `max_dimension`, then encode with
/// metadata.
pub fn postprocess(
    backend: &impl ImageBackend,
    source: &[u8],
    params: &PostprocessParams,
) -> Result<ProcessedImage> {
    let decoded = backend.decode(source)?;
    let (src_w, src_h) = decoded.dimensions();

    let (bitmap, crop_plan) = autocrop_bitmap(decoded, &params.autocrop)?;
    let (w, h) = bitmap.dimensions();
    let plan = plan_max_dimension(w, h, params.max_dimension, params.allow_upscale)?;
    debug!(src_w, src_h, cropped_w = w, cropped_h = h, ?plan, "postprocess");

    let stages = Stages {
        bounds: crop_plan.bounds(src_w, src_h),
        cropped_size: (w, h),
        was_cropped: crop_plan.needs_crop(),
        plan,
    };
    finish(backend, bitmap, stages, params.dpi, &params.software)
}

/// Scale by `params.factor`, then encode with metadata. No cropping.
pub fn resize_by_factor(
    backend: &impl ImageBackend,
    source: &[u8],
    params: &ResizeParams,
) -> Result<ProcessedImage> {
    let bitmap = backend.decode(source)?;
    let (w, h) = bitmap.dimensions();
    let plan = plan_factor(w, h, params.factor.value())?;
    debug!(w, h, ?plan, "resize by factor");

    let stages = Stages {
        bounds: BoundingBox::full_frame(w, h),
        cropped_size: (w, h),
        was_cropped: false,
        plan,
    };
    finish(backend, bitmap, stages, params.dpi, &params.software)
}

/// Autocrop only, then encode with metadata.
pub fn autocrop(
    backend: &impl ImageBackend,
    source: &[u8],
    params: &AutocropParams,
    dpi: Dpi,
    software: &str,
) -> Result<ProcessedImage> {
    let decoded = backend.decode(source)?;
    let (src_w, src_h) = decoded.dimensions();
    let (bitmap, crop_plan) = autocrop_bitmap(decoded, params)?;
    let (w, h) = bitmap.dimensions();

    let stages = Stages {
        bounds: crop_plan.bounds(src_w, src_h),
        cropped_size: (w, h),
        was_cropped: crop_plan.needs_crop(),
        plan: ResizePlan {
            width: w,
            height: h,
            scale: 1.0,
            resized: false,
        },
    };
    finish(backend, bitmap, stages, dpi, software)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::{ResizeFactor, StableSearch};
    use crate::png::{PngStream, read_resolution, software_tag};
    use crate::test_helpers::{bitmap_with_rect, coordinate_bitmap, set_alpha, transparent_bitmap};

    fn post_params(max_dimension: u32) -> PostprocessParams {
        PostprocessParams {
            autocrop: AutocropParams::default(),
            max_dimension,
            allow_upscale: false,
            dpi: Dpi::default(),
            software: "Image Processor Engine".to_string(),
        }
    }

    fn encoded_dimensions(png: &[u8]) -> (u32, u32) {
        PngStream::parse(png).unwrap().dimensions().unwrap()
    }

    // =========================================================================
    // encode_png_with_metadata
    // =========================================================================

    #[test]
    fn encode_stamps_dpi_and_software() {
        let backend = MockBackend::new();
        let bmp = coordinate_bitmap(4, 4, 255);

        let png = encode_png_with_metadata(&backend, &bmp, Dpi::new(300.0), "tool").unwrap();

        let res = read_resolution(&png).unwrap().unwrap();
        assert_eq!((res.ppu_x, res.ppu_y, res.unit), (11811, 11811, 1));
        assert_eq!(software_tag(&png).unwrap().as_deref(), Some("tool"));
        PngStream::parse(&png).unwrap().validate().unwrap();
    }

    // =========================================================================
    // autocrop
    // =========================================================================

    #[test]
    fn autocrop_trims_to_content() {
        let backend = MockBackend::with_bitmaps(vec![bitmap_with_rect(10, 10, (2, 3), (5, 7))]);

        let out = autocrop(&backend, b"src", &AutocropParams::default(), Dpi::default(), "t")
            .unwrap();

        assert!(out.was_cropped);
        assert!(!out.was_resized);
        assert_eq!((out.width, out.height), (4, 5));
        assert_eq!(out.cropped_size, (4, 5));
        assert_eq!(
            out.bounds,
            BoundingBox {
                left: 2,
                top: 3,
                right: 5,
                bottom: 7
            }
        );
        assert_eq!(encoded_dimensions(&out.png), (4, 5));
    }

    #[test]
    fn autocrop_transparent_is_untouched() {
        let backend = MockBackend::with_bitmaps(vec![transparent_bitmap(6, 3)]);

        let out = autocrop(&backend, b"src", &AutocropParams::default(), Dpi::default(), "t")
            .unwrap();

        assert!(!out.was_cropped);
        assert_eq!((out.width, out.height), (6, 3));
        assert!(out.bounds.is_full_frame(6, 3));
    }

    #[test]
    fn autocrop_padding_is_clamped() {
        let backend = MockBackend::with_bitmaps(vec![bitmap_with_rect(10, 10, (1, 1), (2, 2))]);
        let params = AutocropParams {
            padding: 3,
            ..AutocropParams::default()
        };

        let out = autocrop(&backend, b"src", &params, Dpi::default(), "t").unwrap();
        assert_eq!((out.width, out.height), (6, 6));
        assert_eq!(out.bounds.left, 0);
        assert_eq!(out.bounds.right, 5);
    }

    #[test]
    fn autocrop_stable_ignores_faint_fringe() {
        // Faint halo everywhere, solid core in the middle.
        let mut bmp = coordinate_bitmap(10, 10, 20);
        for y in 3..7 {
            for x in 3..7 {
                set_alpha(&mut bmp, x, y, 255);
            }
        }
        let params = AutocropParams {
            stable: Some(StableSearch::default()),
            ..AutocropParams::default()
        };

        let (cropped, plan) = autocrop_bitmap(bmp, &params).unwrap();
        assert!(plan.needs_crop());
        assert_eq!(cropped.dimensions(), (4, 4));
    }

    // =========================================================================
    // postprocess
    // =========================================================================

    #[test]
    fn postprocess_crops_then_resizes() {
        let backend = MockBackend::with_bitmaps(vec![bitmap_with_rect(100, 100, (10, 30), (89, 69))]);

        let out = postprocess(&backend, b"src", &post_params(40)).unwrap();

        assert!(out.was_cropped);
        assert!(out.was_resized);
        assert_eq!(out.cropped_size, (80, 40));
        assert_eq!((out.width, out.height), (40, 20));
        assert_eq!(out.scale, 0.5);
        assert_eq!(encoded_dimensions(&out.png), (40, 20));

        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![
                RecordedOp::Decode { len: 3 },
                RecordedOp::Resize {
                    from: (80, 40),
                    to: (40, 20)
                },
                RecordedOp::EncodePng {
                    width: 40,
                    height: 20
                },
            ]
        );
    }

    #[test]
    fn postprocess_small_image_skips_resize() {
        let backend = MockBackend::with_bitmaps(vec![coordinate_bitmap(30, 20, 255)]);

        let out = postprocess(&backend, b"src", &post_params(2048)).unwrap();

        assert!(!out.was_cropped);
        assert!(!out.was_resized);
        assert_eq!(out.scale, 1.0);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Resize { .. }))
        );
    }

    #[test]
    fn postprocess_upscales_when_allowed() {
        let backend = MockBackend::with_bitmaps(vec![coordinate_bitmap(10, 5, 255)]);
        let params = PostprocessParams {
            allow_upscale: true,
            ..post_params(20)
        };

        let out = postprocess(&backend, b"src", &params).unwrap();
        assert_eq!((out.width, out.height), (20, 10));
        assert_eq!(out.scale, 2.0);
    }

    #[test]
    fn postprocess_propagates_decode_failure() {
        let backend = MockBackend::new();
        let result = postprocess(&backend, b"src", &post_params(100));
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn postprocess_rejects_zero_target() {
        let backend = MockBackend::with_bitmaps(vec![coordinate_bitmap(4, 4, 255)]);
        let result = postprocess(&backend, b"src", &post_params(0));
        assert!(matches!(result, Err(BackendError::Argument(_))));
    }

    // =========================================================================
    // resize_by_factor
    // =========================================================================

    #[test]
    fn resize_by_factor_keeps_transparent_margins() {
        let backend = MockBackend::with_bitmaps(vec![bitmap_with_rect(10, 8, (2, 2), (3, 3))]);
        let params = ResizeParams {
            factor: ResizeFactor::new(2.0),
            dpi: Dpi::new(72.0),
            software: "t".to_string(),
        };

        let out = resize_by_factor(&backend, b"src", &params).unwrap();

        assert!(!out.was_cropped);
        assert!(out.was_resized);
        assert_eq!((out.width, out.height), (20, 16));
        assert!(out.bounds.is_full_frame(10, 8));

        let res = read_resolution(&out.png).unwrap().unwrap();
        assert_eq!(res.ppu_x, 2835);
    }
}
