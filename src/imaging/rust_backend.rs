//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` → `to_rgba8` |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (RGBA8) |

use super::backend::{BackendError, ImageBackend};
use super::bitmap::Bitmap;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, ImageFormat, Rgba};
use std::sync::LazyLock;

/// Extensions accepted as batch inputs when a directory is walked.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, BackendError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode: {}", e)))?;
        Ok(Bitmap::from_rgba_image(img.to_rgba8())?)
    }

    fn resize(&self, bitmap: &Bitmap, width: u32, height: u32) -> Result<Bitmap, BackendError> {
        if bitmap.dimensions() == (width, height) {
            return Ok(bitmap.clone());
        }
        let src = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(
            bitmap.width(),
            bitmap.height(),
            bitmap.pixels(),
        )
        .ok_or_else(|| BackendError::ProcessingFailed("bitmap buffer size mismatch".to_string()))?;
        let resized = image::imageops::resize(&src, width, height, FilterType::Lanczos3);
        Ok(Bitmap::from_rgba_image(resized)?)
    }

    fn encode_png(&self, bitmap: &Bitmap) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(
                bitmap.pixels(),
                bitmap.width(),
                bitmap.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{coordinate_bitmap, minimal_png};
    use image::{Rgb, RgbImage};

    /// Encode an RGB test image with the given format.
    fn encode_rgb(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["png", "jpg", "jpeg", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn decode_hand_built_png() {
        let bmp = RustBackend::new().decode(&minimal_png()).unwrap();
        assert_eq!(bmp.dimensions(), (1, 1));
        assert_eq!(bmp.pixels(), &[255, 0, 0, 255]);
    }

    #[test]
    fn decode_jpeg_is_opaque_rgba() {
        let bytes = encode_rgb(20, 10, ImageFormat::Jpeg);
        let bmp = RustBackend::new().decode(&bytes).unwrap();
        assert_eq!(bmp.dimensions(), (20, 10));
        assert!(bmp.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn resize_exact_dimensions() {
        let backend = RustBackend::new();
        let bmp = coordinate_bitmap(40, 30, 255);
        let out = backend.resize(&bmp, 20, 15).unwrap();
        assert_eq!(out.dimensions(), (20, 15));
    }

    #[test]
    fn resize_keeps_uniform_color() {
        let backend = RustBackend::new();
        let bmp = Bitmap::new(6, 4, [255, 255, 255, 255].repeat(24)).unwrap();
        let out = backend.resize(&bmp, 3, 2).unwrap();
        assert_eq!(out.pixels(), [255, 255, 255, 255].repeat(6).as_slice());
        assert_eq!(bmp.dimensions(), (6, 4));
    }

    #[test]
    fn resize_same_size_is_identity() {
        let backend = RustBackend::new();
        let bmp = coordinate_bitmap(5, 4, 200);
        assert_eq!(backend.resize(&bmp, 5, 4).unwrap(), bmp);
    }

    #[test]
    fn encode_png_roundtrips_pixels() {
        let backend = RustBackend::new();
        let bmp = coordinate_bitmap(7, 5, 128);

        let bytes = backend.encode_png(&bmp).unwrap();
        assert!(crate::png::has_png_signature(&bytes));

        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded, bmp);
    }
}
