//! Tool configuration module.
//!
//! Handles loading, validating, and merging `pngtrim.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of keys.
//!
//! ## Config File Location
//!
//! `pngtrim.toml` in the working directory is picked up automatically. Pass
//! `--config PATH` to use another file (which then must exist).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! software = "Image Processor Engine"  # tEXt "Software" label on every output
//!
//! [postprocess]
//! max_dimension = 2048      # Longest edge after autocrop
//! dpi = 300                 # Written to pHYs (floored at 72)
//! autocrop_padding = 0      # Margin kept around content, in pixels
//! alpha_threshold = 0       # Alpha strictly above this counts as content
//! allow_upscale = false     # Enlarge images smaller than max_dimension
//!
//! [resize]
//! factor = 2.0              # Clamped into 0.1..=8.0
//! dpi = 300
//!
//! [autocrop]
//! padding = 0
//! alpha_threshold = 0
//! dpi = 300
//! stable = false            # Multi-threshold search instead of alpha_threshold
//! stable_thresholds = [10, 50, 128, 200]
//! stable_min_ratio = 0.1    # Boxes covering less of the frame are noise
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    AutocropParams, Dpi, PostprocessParams, ResizeFactor, ResizeParams, StableSearch,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "pngtrim.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `pngtrim.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Text of the `Software` tEXt chunk written to every output.
    pub software: String,
    /// Autocrop → fit longest edge → metadata.
    pub postprocess: PostprocessConfig,
    /// Factor resize → metadata.
    pub resize: ResizeConfig,
    /// Autocrop only → metadata.
    pub autocrop: AutocropConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            software: "Image Processor Engine".to_string(),
            postprocess: PostprocessConfig::default(),
            resize: ResizeConfig::default(),
            autocrop: AutocropConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

fn check_dpi(section: &str, dpi: f64) -> Result<(), ConfigError> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "{section}.dpi must be a positive number"
        )));
    }
    Ok(())
}

impl Config {
    /// Validate config values are within acceptable ranges.
    ///
    /// Out-of-range factors and sub-72 DPI values are not errors; they are
    /// clamped when the parameters are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.postprocess.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "postprocess.max_dimension must be positive".into(),
            ));
        }
        check_dpi("postprocess", self.postprocess.dpi)?;
        check_dpi("resize", self.resize.dpi)?;
        check_dpi("autocrop", self.autocrop.dpi)?;
        if !self.resize.factor.is_finite() {
            return Err(ConfigError::Validation(
                "resize.factor must be a finite number".into(),
            ));
        }
        if self.autocrop.stable_thresholds.is_empty() {
            return Err(ConfigError::Validation(
                "autocrop.stable_thresholds must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.autocrop.stable_min_ratio) {
            return Err(ConfigError::Validation(
                "autocrop.stable_min_ratio must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }

    pub fn postprocess_params(&self) -> PostprocessParams {
        let p = &self.postprocess;
        PostprocessParams {
            autocrop: AutocropParams {
                alpha_threshold: p.alpha_threshold,
                padding: p.autocrop_padding,
                stable: None,
            },
            max_dimension: p.max_dimension,
            allow_upscale: p.allow_upscale,
            dpi: Dpi::new(p.dpi),
            software: self.software.clone(),
        }
    }

    pub fn resize_params(&self) -> ResizeParams {
        ResizeParams {
            factor: ResizeFactor::new(self.resize.factor),
            dpi: Dpi::new(self.resize.dpi),
            software: self.software.clone(),
        }
    }

    pub fn autocrop_params(&self) -> AutocropParams {
        let a = &self.autocrop;
        AutocropParams {
            alpha_threshold: a.alpha_threshold,
            padding: a.padding,
            stable: a.stable.then(|| StableSearch {
                thresholds: a.stable_thresholds.clone(),
                min_ratio: a.stable_min_ratio,
            }),
        }
    }

    pub fn autocrop_dpi(&self) -> Dpi {
        Dpi::new(self.autocrop.dpi)
    }
}

/// `[postprocess]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostprocessConfig {
    pub max_dimension: u32,
    pub dpi: f64,
    pub autocrop_padding: i64,
    pub alpha_threshold: u8,
    pub allow_upscale: bool,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2048,
            dpi: 300.0,
            autocrop_padding: 0,
            alpha_threshold: 0,
            allow_upscale: false,
        }
    }
}

/// `[resize]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub factor: f64,
    pub dpi: f64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            factor: 2.0,
            dpi: 300.0,
        }
    }
}

/// `[autocrop]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutocropConfig {
    pub padding: i64,
    pub alpha_threshold: u8,
    pub dpi: f64,
    pub stable: bool,
    pub stable_thresholds: Vec<u8>,
    pub stable_min_ratio: f64,
}

impl Default for AutocropConfig {
    fn default() -> Self {
        let search = StableSearch::default();
        Self {
            padding: 0,
            alpha_threshold: 0,
            dpi: 300.0,
            stable: false,
            stable_thresholds: search.thresholds,
            stable_min_ratio: search.min_ratio,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config for a run.
///
/// With `explicit = Some(path)` the file must exist. Otherwise
/// `pngtrim.toml` in `dir` is used when present, stock defaults when not.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?)
        }
        None => load_raw_config(&dir.join(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `pngtrim.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pngtrim configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# pngtrim reads ./pngtrim.toml, or the file given with --config.
# Only the keys you want to change need to be present.
# Unknown keys will cause an error.

# Text of the tEXt "Software" chunk stamped on every output PNG.
software = "Image Processor Engine"

# ---------------------------------------------------------------------------
# postprocess: autocrop -> fit longest edge -> PNG with metadata
# ---------------------------------------------------------------------------
[postprocess]
# Longest edge of the output, in pixels.
max_dimension = 2048

# Resolution written to the pHYs chunk. Values below 72 are raised to 72.
dpi = 300

# Transparent margin kept around the content, in pixels. Negative = 0.
autocrop_padding = 0

# Pixels with alpha strictly above this count as content (0-255).
alpha_threshold = 0

# Enlarge images whose longest edge is below max_dimension.
allow_upscale = false

# ---------------------------------------------------------------------------
# resize: scale by a factor -> PNG with metadata (no cropping)
# ---------------------------------------------------------------------------
[resize]
# Scale factor, clamped into 0.1 - 8.0.
factor = 2.0

dpi = 300

# ---------------------------------------------------------------------------
# autocrop: trim transparent margins -> PNG with metadata (no resizing)
# ---------------------------------------------------------------------------
[autocrop]
padding = 0
alpha_threshold = 0
dpi = 300

# Try several thresholds and keep the tightest box that still covers at
# least stable_min_ratio of the frame. Ignores alpha_threshold when on.
stable = false
stable_thresholds = [10, 50, 128, 200]
stable_min_ratio = 0.1

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}
