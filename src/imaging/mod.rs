//! Image processing: decode, trim, resize, and re-encode as PNG.
//!
//! | Operation | Where |
//! |---|---|
//! | **Decode** | `image::load_from_memory` → RGBA8 [`Bitmap`] |
//! | **Alpha bounds / crop** | [`bounds`] (pure) |
//! | **Resize planning** | [`calculations`] (pure) |
//! | **Resample** | Lanczos3 via `image::imageops` |
//! | **Encode** | `PngEncoder`, then `pHYs` + `Software` via [`crate::png`] |
//!
//! The module is split into:
//! - **Bitmap**: Owned RGBA8 buffer shared by every step
//! - **Bounds**: Alpha bounding boxes, padding, crop plans
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod bitmap;
pub mod bounds;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use bitmap::Bitmap;
pub use bounds::{BoundingBox, CropPlan, apply_padding, crop, find_bounds, find_stable_bounds};
pub use calculations::{ResizePlan, plan_explicit_size, plan_factor, plan_max_dimension};
pub use operations::{
    ProcessedImage, autocrop, autocrop_bitmap, encode_png_with_metadata, postprocess,
    resize_by_factor,
};
pub use params::{
    ArgumentError, AutocropParams, Dpi, PostprocessParams, ResizeFactor, ResizeParams,
    StableSearch,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
