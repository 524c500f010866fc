//! Resolution (`pHYs`) and software-label (`tEXt`) editing.
//!
//! Both edits are remove-then-insert at a fixed position, so applying the
//! same edit twice gives the same bytes as applying it once:
//!
//! - `pHYs` goes immediately after `IHDR`.
//! - `tEXt` with keyword `Software` goes immediately before `IEND`.
//!
//! Input that is not a PNG is rejected with [`FormatError`]; nothing is
//! passed through unchanged.

use super::FormatError;
use super::chunk::{Chunk, ChunkType, PngStream, parse_png, rebuild_png};
use tracing::debug;

/// Keyword of the text chunk we stamp.
pub const SOFTWARE_KEYWORD: &str = "Software";

const METERS_PER_INCH: f64 = 0.0254;

/// `pHYs` unit byte for "pixels per meter".
const UNIT_METER: u8 = 1;

/// Largest density the format allows (values are 31-bit).
const MAX_PPM: u32 = i32::MAX as u32;

/// Convert dots-per-inch to pixels-per-meter, rounding half away from zero.
///
/// Never returns 0: zero, negative, and NaN inputs clamp to 1.
pub fn dpi_to_ppm(dpi: f64) -> u32 {
    let ppm = (dpi / METERS_PER_INCH).round();
    if ppm.is_nan() || ppm < 1.0 {
        1
    } else if ppm >= MAX_PPM as f64 {
        MAX_PPM
    } else {
        ppm as u32
    }
}

/// Decoded contents of a `pHYs` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub ppu_x: u32,
    pub ppu_y: u32,
    /// 1 = meter, 0 = unknown (aspect ratio only).
    pub unit: u8,
}

impl Resolution {
    pub fn from_dpi(dpi_x: f64, dpi_y: f64) -> Self {
        Self {
            ppu_x: dpi_to_ppm(dpi_x),
            ppu_y: dpi_to_ppm(dpi_y),
            unit: UNIT_METER,
        }
    }

    /// DPI on each axis, if the unit is meters.
    pub fn dpi(&self) -> Option<(f64, f64)> {
        (self.unit == UNIT_METER).then(|| {
            (
                self.ppu_x as f64 * METERS_PER_INCH,
                self.ppu_y as f64 * METERS_PER_INCH,
            )
        })
    }

    fn to_chunk(self) -> Chunk {
        let mut data = Vec::with_capacity(9);
        data.extend_from_slice(&self.ppu_x.to_be_bytes());
        data.extend_from_slice(&self.ppu_y.to_be_bytes());
        data.push(self.unit);
        Chunk::new(ChunkType::pHYs, data)
    }

    fn from_chunk(chunk: &Chunk) -> Option<Self> {
        match chunk.data.as_slice() {
            [x0, x1, x2, x3, y0, y1, y2, y3, unit] => Some(Self {
                ppu_x: u32::from_be_bytes([*x0, *x1, *x2, *x3]),
                ppu_y: u32::from_be_bytes([*y0, *y1, *y2, *y3]),
                unit: *unit,
            }),
            _ => None,
        }
    }
}

/// Replace any `pHYs` chunk in `chunks` with `resolution`, right after `IHDR`.
///
/// Streams without `IHDR` get it before the first `IDAT`, or at the front.
pub fn insert_resolution(chunks: &mut Vec<Chunk>, resolution: Resolution) {
    let before = chunks.len();
    chunks.retain(|c| c.chunk_type != ChunkType::pHYs);
    let removed = before - chunks.len();

    let at = chunks
        .iter()
        .position(|c| c.chunk_type == ChunkType::IHDR)
        .map(|i| i + 1)
        .or_else(|| chunks.iter().position(|c| c.chunk_type == ChunkType::IDAT))
        .unwrap_or(0);

    debug!(removed, at, ?resolution, "inserting pHYs");
    chunks.insert(at, resolution.to_chunk());
}

/// Set the physical resolution of a PNG, in dots per inch per axis.
pub fn set_resolution(bytes: &[u8], dpi_x: f64, dpi_y: f64) -> Result<Vec<u8>, FormatError> {
    let mut chunks = parse_png(bytes)?;
    insert_resolution(&mut chunks, Resolution::from_dpi(dpi_x, dpi_y));
    Ok(rebuild_png(&chunks))
}

/// [`set_resolution`] with the same DPI on both axes.
pub fn set_dpi(bytes: &[u8], dpi: f64) -> Result<Vec<u8>, FormatError> {
    set_resolution(bytes, dpi, dpi)
}

/// Read the first `pHYs` chunk, if any well-formed one exists.
pub fn read_resolution(bytes: &[u8]) -> Result<Option<Resolution>, FormatError> {
    Ok(PngStream::parse(bytes)?.resolution())
}

/// Split `tEXt` data into keyword and text at the first NUL.
fn split_text(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    Some((&data[..nul], &data[nul + 1..]))
}

fn is_software_text(chunk: &Chunk) -> bool {
    chunk.chunk_type == ChunkType::tEXt
        && split_text(&chunk.data).is_some_and(|(kw, _)| kw == SOFTWARE_KEYWORD.as_bytes())
}

/// Replace any `tEXt` `Software` chunk with one carrying `text`, right
/// before `IEND` (or at the end if there is no `IEND`).
///
/// NUL characters are dropped from `text`, since `tEXt` uses NUL as its
/// keyword separator.
pub fn insert_software_tag(chunks: &mut Vec<Chunk>, text: &str) {
    let before = chunks.len();
    chunks.retain(|c| !is_software_text(c));
    let removed = before - chunks.len();

    let mut data = Vec::with_capacity(SOFTWARE_KEYWORD.len() + 1 + text.len());
    data.extend_from_slice(SOFTWARE_KEYWORD.as_bytes());
    data.push(0);
    data.extend(text.bytes().filter(|&b| b != 0));

    let at = chunks
        .iter()
        .position(|c| c.chunk_type == ChunkType::IEND)
        .unwrap_or(chunks.len());

    debug!(removed, at, text, "inserting tEXt Software");
    chunks.insert(at, Chunk::new(ChunkType::tEXt, data));
}

/// Stamp a `Software` text chunk into a PNG.
pub fn set_software_tag(bytes: &[u8], text: &str) -> Result<Vec<u8>, FormatError> {
    let mut chunks = parse_png(bytes)?;
    insert_software_tag(&mut chunks, text);
    Ok(rebuild_png(&chunks))
}

/// Read the `Software` text, if present.
///
/// Text that is not valid UTF-8 is read as Latin-1.
pub fn software_tag(bytes: &[u8]) -> Result<Option<String>, FormatError> {
    Ok(PngStream::parse(bytes)?.software())
}

impl PngStream {
    /// First well-formed `pHYs` chunk.
    pub fn resolution(&self) -> Option<Resolution> {
        self.chunks
            .iter()
            .filter(|c| c.chunk_type == ChunkType::pHYs)
            .find_map(Resolution::from_chunk)
    }

    /// Text of the first `Software` `tEXt` chunk.
    pub fn software(&self) -> Option<String> {
        self.chunks
            .iter()
            .filter(|c| is_software_text(c))
            .find_map(|c| split_text(&c.data).map(|(_, text)| text))
            .map(|text| match std::str::from_utf8(text) {
                Ok(s) => s.to_string(),
                Err(_) => text.iter().map(|&b| b as char).collect(),
            })
    }
}
