//! PNG chunk surgery, without decoding pixels.
//!
//! | Piece | Role |
//! |---|---|
//! | [`chunk`] | Parse a byte stream into [`Chunk`]s and rebuild it with fresh CRCs |
//! | [`crc`] | CRC-32 with a lazily built, process-wide lookup table |
//! | [`metadata`] | Replace the `pHYs` resolution chunk and the `Software` `tEXt` chunk |

pub mod chunk;
pub mod crc;
pub mod metadata;

pub use chunk::{Chunk, ChunkType, PngStream, has_png_signature, parse_png, rebuild_png};
pub use crc::crc32;
pub use metadata::{
    Resolution, SOFTWARE_KEYWORD, dpi_to_ppm, read_resolution, set_dpi, set_resolution,
    set_software_tag, software_tag,
};

use thiserror::Error;

/// The fixed 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// A byte stream that is not a well-formed PNG.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing PNG signature")]
    BadSignature,
    #[error("truncated chunk header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[error(
        "chunk {chunk_type} at offset {offset} declares {declared_len} bytes but only {available} remain"
    )]
    ChunkOverrun {
        chunk_type: ChunkType,
        offset: usize,
        declared_len: usize,
        available: usize,
    },
    #[error("first chunk is not IHDR")]
    MissingIhdr,
    #[error("stream does not end with an empty IEND chunk")]
    MissingIend,
    #[error("more than one {0} chunk")]
    Duplicate(ChunkType),
}
