//! Where source bytes come from and where encoded PNGs go.
//!
//! Pipelines only see the [`Storage`] trait: `fetch` a source by locator,
//! `store` a named output and get its locator back. [`FsStorage`] is the
//! local-disk implementation used by the CLI; tests swap in an in-memory
//! one.

use crate::imaging::supported_input_extensions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid output name: {0:?}")]
    InvalidName(String),
}

/// Byte-level access to sources and outputs.
///
/// Must be `Sync`: batches share one storage across rayon workers.
pub trait Storage: Sync {
    /// Read a whole source.
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, StorageError>;

    /// Persist `bytes` under `name` and return a locator for the result.
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Local filesystem storage.
///
/// Sources are read from the path given as locator. Outputs are written
/// flat under `output_dir`, which is created on first store.
#[derive(Debug, Clone)]
pub struct FsStorage {
    output_dir: PathBuf,
}

impl FsStorage {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Output names are single path components.
fn check_name(name: &str) -> Result<(), StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::InvalidName(name.to_string())),
    }
}

impl Storage for FsStorage {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, StorageError> {
        let path = Path::new(locator);
        std::fs::read(path).map_err(io_error(path))
    }

    fn store(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        check_name(name)?;
        std::fs::create_dir_all(&self.output_dir).map_err(io_error(&self.output_dir))?;

        // Write beside the target, then rename over it.
        let path = self.output_dir.join(name);
        let partial = self.output_dir.join(format!(".{name}.partial"));
        std::fs::write(&partial, bytes).map_err(io_error(&partial))?;
        std::fs::rename(&partial, &path).map_err(io_error(&path))?;

        debug!(path = %path.display(), len = bytes.len(), "stored output");
        Ok(path.to_string_lossy().into_owned())
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()))
}

/// Expand the CLI's input arguments into source locators.
///
/// Files are kept as given, in order, whatever their extension. Directories
/// are walked recursively and contribute their supported images sorted by
/// path.
pub fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<String>, StorageError> {
    let mut sources = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            sources.push(input.to_string_lossy().into_owned());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_supported_image(entry.path()) {
                found.push(entry.path().to_string_lossy().into_owned());
            }
        }
        debug!(dir = %input.display(), count = found.len(), "collected sources");
        sources.extend(found);
    }
    Ok(sources)
}
