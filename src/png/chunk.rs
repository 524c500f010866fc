//! Chunk-level view of a PNG byte stream.
//!
//! A PNG file is an 8-byte signature followed by chunks laid out as
//!
//! ```text
//! +--------+--------+----------------+--------+
//! | length |  type  |  data (length) |  CRC   |
//! | 4 B BE |  4 B   |                | 4 B BE |
//! +--------+--------+----------------+--------+
//! ```
//!
//! where the CRC covers `type ++ data`. Nothing here inflates `IDAT`: edits
//! cost O(chunk count) and image data passes through byte-for-byte.
//!
//! Parsing keeps each chunk's declared CRC but does not reject mismatches;
//! [`rebuild_png`] always writes a freshly computed CRC.

use super::crc::Crc32;
use super::{FormatError, PNG_SIGNATURE};
use std::fmt;
use tracing::trace;

/// Length field + type field + CRC field.
const CHUNK_OVERHEAD: usize = 12;

/// A 4-byte ASCII chunk tag such as `IHDR` or `tEXt`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkType(pub [u8; 4]);

#[allow(non_upper_case_globals)]
impl ChunkType {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const IDAT: Self = Self(*b"IDAT");
    pub const IEND: Self = Self(*b"IEND");
    pub const pHYs: Self = Self(*b"pHYs");
    pub const tEXt: Self = Self(*b"tEXt");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Lowercase first letter marks an ancillary chunk.
    pub fn is_ancillary(&self) -> bool {
        self.0[0].is_ascii_lowercase()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self)
    }
}

/// One chunk: a tag plus its payload.
///
/// `declared_crc` is what the source stream carried, if the chunk was
/// parsed; chunks built in memory have none.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_type: ChunkType,
    pub data: Vec<u8>,
    pub declared_crc: Option<u32>,
}

impl Chunk {
    pub fn new(chunk_type: ChunkType, data: Vec<u8>) -> Self {
        Self {
            chunk_type,
            data,
            declared_crc: None,
        }
    }

    /// CRC-32 over `type ++ data`.
    pub fn crc(&self) -> u32 {
        let mut crc = Crc32::new();
        crc.update(self.chunk_type.as_bytes());
        crc.update(&self.data);
        crc.finalize()
    }

    /// True when no CRC was declared or the declared one is correct.
    pub fn crc_matches(&self) -> bool {
        self.declared_crc.is_none_or(|declared| declared == self.crc())
    }

    /// Size of this chunk on the wire.
    pub fn encoded_len(&self) -> usize {
        CHUNK_OVERHEAD + self.data.len()
    }

    /// Append the wire form of this chunk to `out`, with a fresh CRC.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(self.chunk_type.as_bytes());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.crc().to_be_bytes());
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("chunk_type", &self.chunk_type)
            .field(
                "data",
                &(&self.data[..self.data.len().min(12)], self.data.len()),
            )
            .field("declared_crc", &self.declared_crc)
            .finish()
    }
}

/// True if `bytes` starts with the PNG signature.
pub fn has_png_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Split a PNG byte stream into its chunks, in stream order.
///
/// Fails if the signature is wrong or any chunk would read past the end of
/// the buffer. Declared CRCs are recorded, not checked.
pub fn parse_png(bytes: &[u8]) -> Result<Vec<Chunk>, FormatError> {
    if !has_png_signature(bytes) {
        return Err(FormatError::BadSignature);
    }

    let mut chunks = Vec::new();
    let mut offset = PNG_SIGNATURE.len();

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < 8 {
            return Err(FormatError::TruncatedHeader { offset });
        }

        let declared_len = read_u32(bytes, offset) as usize;
        let chunk_type = ChunkType([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]);

        let needed = declared_len
            .checked_add(CHUNK_OVERHEAD)
            .ok_or(FormatError::ChunkOverrun {
                chunk_type,
                offset,
                declared_len,
                available: remaining,
            })?;
        if needed > remaining {
            return Err(FormatError::ChunkOverrun {
                chunk_type,
                offset,
                declared_len,
                available: remaining.saturating_sub(CHUNK_OVERHEAD),
            });
        }

        let data_start = offset + 8;
        let data_end = data_start + declared_len;
        let declared_crc = read_u32(bytes, data_end);

        trace!(%chunk_type, offset, len = declared_len, "parsed chunk");
        chunks.push(Chunk {
            chunk_type,
            data: bytes[data_start..data_end].to_vec(),
            declared_crc: Some(declared_crc),
        });

        offset = data_end + 4;
    }

    Ok(chunks)
}

/// Serialize chunks back into a PNG byte stream.
///
/// Writes the signature, then every chunk with a recomputed CRC. The result
/// is structurally valid as long as the chunk order is (IHDR first, IEND
/// last).
pub fn rebuild_png(chunks: &[Chunk]) -> Vec<u8> {
    let total = PNG_SIGNATURE.len() + chunks.iter().map(Chunk::encoded_len).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&PNG_SIGNATURE);
    for chunk in chunks {
        chunk.write_to(&mut out);
    }
    out
}

/// A parsed PNG: the fixed signature is implied, only the chunks are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngStream {
    pub chunks: Vec<Chunk>,
}

impl PngStream {
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        Ok(Self {
            chunks: parse_png(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        rebuild_png(&self.chunks)
    }

    /// Check the structural rules: exactly one `IHDR`, first; exactly one
    /// `IEND`, last, with no data.
    pub fn validate(&self) -> Result<(), FormatError> {
        match self.chunks.first() {
            Some(c) if c.chunk_type == ChunkType::IHDR => {}
            _ => return Err(FormatError::MissingIhdr),
        }
        match self.chunks.last() {
            Some(c) if c.chunk_type == ChunkType::IEND && c.data.is_empty() => {}
            _ => return Err(FormatError::MissingIend),
        }
        let count = |t: ChunkType| self.chunks.iter().filter(|c| c.chunk_type == t).count();
        if count(ChunkType::IHDR) != 1 {
            return Err(FormatError::Duplicate(ChunkType::IHDR));
        }
        if count(ChunkType::IEND) != 1 {
            return Err(FormatError::Duplicate(ChunkType::IEND));
        }
        Ok(())
    }

    /// Index of the first chunk of the given type.
    pub fn position(&self, chunk_type: ChunkType) -> Option<usize> {
        self.chunks.iter().position(|c| c.chunk_type == chunk_type)
    }

    /// Width and height from the `IHDR` chunk, if present and well-sized.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let ihdr = &self.chunks[self.position(ChunkType::IHDR)?];
        let width = u32::from_be_bytes(ihdr.data.get(0..4)?.try_into().ok()?);
        let height = u32::from_be_bytes(ihdr.data.get(4..8)?.try_into().ok()?);
        Some((width, height))
    }

    /// Chunks whose declared CRC does not match their contents.
    pub fn corrupt_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| !c.crc_matches())
    }
}
