//! Batch processing: run one pipeline over many sources.
//!
//! Every CLI command that touches pixels goes through [`process_batch`]:
//!
//! ```text
//! sources ──select──▶ fetch ──pipeline──▶ store ──▶ BatchReport
//!   (1-based)          (Storage)  (imaging)   (Storage)   (JSON)
//! ```
//!
//! ## Pipelines
//!
//! | Pipeline | Steps | Output name |
//! |---|---|---|
//! | `postprocess` | autocrop → fit longest edge → PNG + metadata | `{stem}-{max}-{dpi}dpi.png` |
//! | `resize` | scale by factor → PNG + metadata | `{stem}-x{factor}.png` |
//! | `autocrop` | autocrop → PNG + metadata | `{stem}-cropped.png` |
//!
//! ## Selection
//!
//! `selected` holds 1-based positions into the source list. Non-positive
//! entries are ignored; if nothing is left, every source is processed. A
//! selection that matches no source is an error. Reports keep the 1-based
//! position as `original_index`.
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon).
//! Results come back in input order; the first failure aborts the batch.

use crate::imaging::{
    self, AutocropParams, BackendError, BoundingBox, Dpi, ImageBackend, PostprocessParams,
    ProcessedImage, ResizeParams, RustBackend,
};
use crate::storage::{Storage, StorageError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image processing failed for {locator}: {error}")]
    Imaging {
        locator: String,
        #[source]
        error: BackendError,
    },
    #[error("No source images given")]
    NoSources,
    #[error("No images match the selected indices {0:?}")]
    EmptySelection(Vec<i64>),
}

/// Which pipeline to run, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Pipeline {
    Postprocess(PostprocessParams),
    Resize(ResizeParams),
    Autocrop {
        params: AutocropParams,
        dpi: Dpi,
        software: String,
    },
}

impl Pipeline {
    pub fn name(&self) -> &'static str {
        match self {
            Pipeline::Postprocess(_) => "postprocess",
            Pipeline::Resize(_) => "resize",
            Pipeline::Autocrop { .. } => "autocrop",
        }
    }

    /// Output file name for a source with the given stem.
    pub fn output_name(&self, stem: &str) -> String {
        match self {
            Pipeline::Postprocess(p) => {
                format!("{}-{}-{}dpi.png", stem, p.max_dimension, p.dpi.value())
            }
            Pipeline::Resize(p) => format!("{}-x{}.png", stem, p.factor.value()),
            Pipeline::Autocrop { .. } => format!("{}-cropped.png", stem),
        }
    }

    /// The effective settings, as echoed in the report.
    pub fn settings(&self) -> serde_json::Value {
        match self {
            Pipeline::Postprocess(p) => serde_json::json!({
                "max_dimension": p.max_dimension,
                "dpi": p.dpi.value(),
                "autocrop_padding": p.autocrop.padding.max(0),
                "alpha_threshold": p.autocrop.alpha_threshold,
                "allow_upscale": p.allow_upscale,
                "software": p.software,
            }),
            Pipeline::Resize(p) => serde_json::json!({
                "factor": p.factor.value(),
                "dpi": p.dpi.value(),
                "software": p.software,
            }),
            Pipeline::Autocrop {
                params,
                dpi,
                software,
            } => serde_json::json!({
                "padding": params.padding.max(0),
                "alpha_threshold": params.alpha_threshold,
                "stable": params.stable.as_ref().map(|s| serde_json::json!({
                    "thresholds": s.thresholds,
                    "min_ratio": s.min_ratio,
                })),
                "dpi": dpi.value(),
                "software": software,
            }),
        }
    }

    fn run(&self, backend: &impl ImageBackend, source: &[u8]) -> Result<ProcessedImage, BackendError> {
        match self {
            Pipeline::Postprocess(p) => imaging::postprocess(backend, source, p),
            Pipeline::Resize(p) => imaging::resize_by_factor(backend, source, p),
            Pipeline::Autocrop {
                params,
                dpi,
                software,
            } => imaging::autocrop(backend, source, params, *dpi, software),
        }
    }
}

/// Per-image entry in the batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    /// 1-based position in the source list.
    pub original_index: usize,
    pub source: String,
    /// Where the output was stored.
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub crop_bounds: BoundingBox,
    pub cropped_width: u32,
    pub cropped_height: u32,
    pub was_cropped: bool,
    pub was_resized: bool,
    pub scale: f64,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub pipeline: String,
    pub settings: serde_json::Value,
    pub images: Vec<ImageReport>,
}

impl BatchReport {
    pub fn to_json(&self) -> Result<String, ProcessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    BatchStarted {
        pipeline: &'static str,
        image_count: usize,
    },
    ImageProcessed {
        index: usize,
        source: String,
        output: String,
        width: u32,
        height: u32,
        was_cropped: bool,
        was_resized: bool,
    },
}

/// Apply a 1-based selection to `sources`.
///
/// Returns `(original_index, locator)` pairs in source order.
pub fn select_sources<'a>(
    sources: &'a [String],
    selected: &[i64],
) -> Result<Vec<(usize, &'a str)>, ProcessError> {
    if sources.is_empty() {
        return Err(ProcessError::NoSources);
    }
    let wanted: BTreeSet<usize> = selected
        .iter()
        .filter(|&&i| i > 0)
        .map(|&i| i as usize)
        .collect();

    let picked: Vec<(usize, &str)> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| (i + 1, s.as_str()))
        .filter(|(index, _)| wanted.is_empty() || wanted.contains(index))
        .collect();

    if picked.is_empty() {
        return Err(ProcessError::EmptySelection(selected.to_vec()));
    }
    Ok(picked)
}

fn file_stem(locator: &str) -> String {
    Path::new(locator)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string())
}

/// Stems for each picked source. Sources sharing a stem get their
/// 1-based index appended so outputs do not overwrite each other; a
/// suffixed name that is still taken gets a counter as well.
fn unique_stems(picked: &[(usize, &str)]) -> Vec<String> {
    let stems: Vec<String> = picked.iter().map(|(_, loc)| file_stem(loc)).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }
    // Stems seen once keep their name, so reserve those first.
    let mut taken: HashSet<String> = stems
        .iter()
        .filter(|stem| counts[stem.as_str()] == 1)
        .cloned()
        .collect();

    stems
        .iter()
        .zip(picked)
        .map(|(stem, (index, _))| {
            if counts[stem.as_str()] == 1 {
                return stem.clone();
            }
            let base = format!("{}-{}", stem, index);
            let mut name = base.clone();
            let mut n = 2;
            while taken.contains(&name) {
                name = format!("{}-{}", base, n);
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Run `pipeline` over the selected sources with the production backend.
pub fn process(
    storage: &impl Storage,
    sources: &[String],
    selected: &[i64],
    pipeline: &Pipeline,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    let backend = RustBackend::new();
    process_batch(&backend, storage, sources, selected, pipeline, progress)
}

/// Run `pipeline` using a specific backend (allows testing with mock).
pub fn process_batch(
    backend: &impl ImageBackend,
    storage: &impl Storage,
    sources: &[String],
    selected: &[i64],
    pipeline: &Pipeline,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchReport, ProcessError> {
    let picked = select_sources(sources, selected)?;
    let stems = unique_stems(&picked);
    info!(
        pipeline = pipeline.name(),
        selected = picked.len(),
        total = sources.len(),
        "starting batch"
    );
    if let Some(tx) = &progress {
        tx.send(ProcessEvent::BatchStarted {
            pipeline: pipeline.name(),
            image_count: picked.len(),
        })
        .ok();
    }

    let images = picked
        .par_iter()
        .zip(stems.par_iter())
        .map(|(&(index, locator), stem)| -> Result<ImageReport, ProcessError> {
            let bytes = storage.fetch(locator)?;
            let result = pipeline
                .run(backend, &bytes)
                .map_err(|error| ProcessError::Imaging {
                    locator: locator.to_string(),
                    error,
                })?;
            let output = storage.store(&pipeline.output_name(stem), &result.png)?;
            debug!(index, locator, %output, "image processed");

            if let Some(tx) = &progress {
                tx.send(ProcessEvent::ImageProcessed {
                    index,
                    source: locator.to_string(),
                    output: output.clone(),
                    width: result.width,
                    height: result.height,
                    was_cropped: result.was_cropped,
                    was_resized: result.was_resized,
                })
                .ok();
            }

            Ok(ImageReport {
                original_index: index,
                source: locator.to_string(),
                output,
                width: result.width,
                height: result.height,
                crop_bounds: result.bounds,
                cropped_width: result.cropped_size.0,
                cropped_height: result.cropped_size.1,
                was_cropped: result.was_cropped,
                was_resized: result.was_resized,
                scale: result.scale,
                sha256: format!("{:x}", Sha256::digest(&result.png)),
            })
        })
        .collect::<Result<Vec<_>, ProcessError>>()?;

    Ok(BatchReport {
        pipeline: pipeline.name().to_string(),
        settings: pipeline.settings(),
        images,
    })
}
