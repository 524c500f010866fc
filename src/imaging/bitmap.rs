//! Owned RGBA8 pixel buffer.

use super::params::ArgumentError;
use image::RgbaImage;

/// Row-major RGBA pixels, 4 bytes per pixel.
///
/// Width and height are always non-zero and `pixels.len() == width * height * 4`.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ArgumentError> {
        if width == 0 || height == 0 {
            return Err(ArgumentError::InvalidDimensions { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(ArgumentError::InvalidDimensions { width, height })?;
        if pixels.len() != expected {
            return Err(ArgumentError::PixelLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    #[cfg(test)]
    pub(crate) fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixels[((y as usize * self.width as usize + x as usize) * 4) + 3]
    }

    /// Byte length of one row.
    pub(crate) fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn from_rgba_image(img: RgbaImage) -> Result<Self, ArgumentError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}
