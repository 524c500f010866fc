//! Shared test utilities: hand-built PNG streams and synthetic bitmaps.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let png = minimal_png();                      // 1x1 opaque red, IHDR/IDAT/IEND
//! let bmp = bitmap_with_rect(10, 10, (2, 3), (5, 7)); // opaque only inside the rect
//! ```

use crate::imaging::Bitmap;
use crate::png::{PNG_SIGNATURE, crc32};

// =========================================================================
// PNG streams
// =========================================================================

/// Wire form of one chunk: length, type, data, CRC.
pub fn raw_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + data.len());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    let mut crc_input = chunk_type.to_vec();
    crc_input.extend_from_slice(data);
    out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
    out
}

/// A complete, decodable 1x1 RGBA PNG containing one opaque red pixel.
///
/// The IDAT is a zlib stream with a single stored block, so no compressor
/// is involved.
pub fn minimal_png() -> Vec<u8> {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes()); // width
    ihdr.extend_from_slice(&1u32.to_be_bytes()); // height
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]); // 8-bit RGBA, no interlace

    let idat = [
        0x78, 0x01, // zlib header
        0x01, 0x05, 0x00, 0xFA, 0xFF, // final stored block, len 5
        0x00, 0xFF, 0x00, 0x00, 0xFF, // filter none, RGBA
        0x05, 0x00, 0x01, 0xFF, // adler32
    ];

    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(raw_chunk(b"IHDR", &ihdr));
    bytes.extend(raw_chunk(b"IDAT", &idat));
    bytes.extend(raw_chunk(b"IEND", &[]));
    bytes
}

// =========================================================================
// Bitmaps
// =========================================================================

/// Fully transparent bitmap.
pub fn transparent_bitmap(width: u32, height: u32) -> Bitmap {
    Bitmap::new(width, height, vec![0; (width * height * 4) as usize]).unwrap()
}

/// Bitmap whose pixels are opaque white inside the inclusive rectangle
/// `(left, top)..=(right, bottom)` and transparent black elsewhere.
pub fn bitmap_with_rect(
    width: u32,
    height: u32,
    (left, top): (u32, u32),
    (right, bottom): (u32, u32),
) -> Bitmap {
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    for y in top..=bottom {
        for x in left..=right {
            let i = ((y * width + x) * 4) as usize;
            pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
        }
    }
    Bitmap::new(width, height, pixels).unwrap()
}

/// Bitmap where every pixel's red channel encodes its x and green its y,
/// with the given alpha everywhere. Handy for checking crop offsets.
pub fn coordinate_bitmap(width: u32, height: u32, alpha: u8) -> Bitmap {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, 0, alpha]);
        }
    }
    Bitmap::new(width, height, pixels).unwrap()
}

/// Set a single pixel's alpha.
pub fn set_alpha(bitmap: &mut Bitmap, x: u32, y: u32, alpha: u8) {
    let i = ((y * bitmap.width() + x) * 4 + 3) as usize;
    bitmap.pixels_mut()[i] = alpha;
}
