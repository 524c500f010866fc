//! # pngtrim
//!
//! Batch tool for print-ready PNGs: trims transparent margins, fits or
//! scales images, and stamps every output with a `pHYs` resolution chunk
//! and a `tEXt` `Software` tag.
//!
//! # Architecture
//!
//! ```text
//! inputs ──collect──▶ sources ──select──▶ pipeline (rayon) ──▶ outputs + BatchReport
//! ```
//!
//! Pixel work and chunk surgery are separate layers. [`imaging`] decodes,
//! crops, and resamples into an RGBA8 [`imaging::Bitmap`] and encodes a
//! plain PNG; [`png`] then rewrites that PNG's chunk list without touching
//! image data. Each layer is testable without the other: the pipelines run
//! against a mock backend, and the chunk code works on hand-built byte
//! streams.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`png`] | Chunk codec, CRC-32, `pHYs` and `tEXt` metadata editing |
//! | [`imaging`] | Alpha bounds, crop, resize planning, decode/resize/encode backend |
//! | [`process`] | Pipelines, 1-based selection, parallel batch runs, JSON report |
//! | [`storage`] | Source fetch / output store, input directory walking |
//! | [`config`] | `pngtrim.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | CLI output formatting for batches and `inspect` |
//!
//! # Design Decisions
//!
//! ## Metadata After Encoding
//!
//! The PNG encoder writes only `IHDR`, `IDAT`, and `IEND`. Resolution and
//! software tags are added afterwards by rewriting the chunk list, so the
//! same code also re-stamps PNGs produced elsewhere. Stamping is idempotent:
//! an existing `pHYs` or `Software` entry is replaced, never duplicated.
//!
//! ## Transparent Images Pass Through
//!
//! An image with no pixel above the alpha threshold has no content box.
//! It is kept whole rather than cropped to nothing.
//!
//! ## Whole-Batch Failure
//!
//! A batch either produces a full report or an error naming the first
//! source that failed. Outputs already written are left in place.

pub mod config;
pub mod imaging;
pub mod output;
pub mod png;
pub mod process;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
