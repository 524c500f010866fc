//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait covers the three pixel-level steps every
//! pipeline needs: decode to RGBA, resample, and encode to PNG. Everything
//! else (bounds, planning, chunk edits) is pure code outside the backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and statically linked into the binary.

use super::bitmap::Bitmap;
use super::params::ArgumentError;
use crate::png::FormatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Invalid PNG: {0}")]
    Format(#[from] FormatError),
    #[error("Invalid argument: {0}")]
    Argument(#[from] ArgumentError),
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: batches call one shared backend from
/// rayon worker threads.
pub trait ImageBackend: Sync {
    /// Decode any supported raster format into straight-alpha RGBA8.
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&self, bitmap: &Bitmap, width: u32, height: u32) -> Result<Bitmap, BackendError>;

    /// Encode as an RGBA PNG. Metadata chunks are added afterwards by
    /// [`crate::png`].
    fn encode_png(&self, bitmap: &Bitmap) -> Result<Vec<u8>, BackendError>;
}
