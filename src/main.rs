use clap::{Parser, Subcommand};
use pngtrim::process::{self, BatchReport, Pipeline};
use pngtrim::storage::{FsStorage, Storage, collect_sources};
use pngtrim::{config, output};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pngtrim")]
#[command(about = "Trim transparent margins, resize, and stamp print metadata on PNGs")]
#[command(long_about = "\
Trim transparent margins, resize, and stamp print metadata on PNGs

Every command reads images (PNG, JPEG, TIFF, WebP), runs one pipeline, and
writes PNGs carrying a pHYs resolution chunk and a tEXt \"Software\" tag.

Pipelines:

  postprocess   autocrop → fit longest edge → {stem}-{max}-{dpi}dpi.png
  resize        scale by factor            → {stem}-x{factor}.png
  autocrop      autocrop only              → {stem}-cropped.png

Inputs may be files or directories (walked recursively, sorted by path).
--select picks 1-based positions from that list; non-positive entries are
ignored and an empty selection means every image.

Defaults come from pngtrim.toml in the working directory when present.
Run 'pngtrim gen-config' to generate a documented pngtrim.toml.

Set RUST_LOG (e.g. RUST_LOG=pngtrim=debug) to control log output.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./pngtrim.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "out", global = true)]
    output: PathBuf,

    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by the pixel pipelines.
#[derive(clap::Args, Clone)]
struct BatchArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 1-based positions to process, comma separated (default: all)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    select: Vec<i64>,

    /// Write the JSON batch report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Text of the tEXt "Software" chunk
    #[arg(long)]
    software: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Autocrop, fit the longest edge, and stamp DPI metadata
    Postprocess {
        #[command(flatten)]
        batch: BatchArgs,
        /// Longest edge in pixels
        #[arg(long)]
        max_dimension: Option<u32>,
        /// Output resolution (floored at 72)
        #[arg(long)]
        dpi: Option<f64>,
        /// Margin kept around content, in pixels
        #[arg(long)]
        padding: Option<i64>,
        /// Alpha strictly above this counts as content
        #[arg(long)]
        threshold: Option<u8>,
        /// Enlarge images smaller than the max dimension
        #[arg(long)]
        allow_upscale: bool,
    },
    /// Scale by a factor and stamp DPI metadata
    Resize {
        #[command(flatten)]
        batch: BatchArgs,
        /// Scale factor (clamped into 0.1..=8)
        #[arg(long)]
        factor: Option<f64>,
        /// Output resolution (floored at 72)
        #[arg(long)]
        dpi: Option<f64>,
    },
    /// Trim transparent margins and stamp DPI metadata
    Autocrop {
        #[command(flatten)]
        batch: BatchArgs,
        /// Margin kept around content, in pixels
        #[arg(long)]
        padding: Option<i64>,
        /// Alpha strictly above this counts as content
        #[arg(long)]
        threshold: Option<u8>,
        /// Output resolution (floored at 72)
        #[arg(long)]
        dpi: Option<f64>,
        /// Search several thresholds for a box that ignores faint noise
        #[arg(long)]
        stable: bool,
    },
    /// List the chunks and metadata of PNG files
    Inspect {
        /// PNG files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print a stock pngtrim.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // gen-config must work even when the existing pngtrim.toml is broken.
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut cfg = config::load_config(Path::new("."), cli.config.as_deref())?;

    let (batch, pipeline) = match cli.command {
        Command::GenConfig => return Ok(()),
        Command::Inspect { inputs } => {
            let storage = FsStorage::new(&cli.output);
            for locator in collect_sources(&inputs)? {
                match storage.fetch(&locator) {
                    Ok(bytes) => output::print_inspect(&locator, &bytes),
                    Err(e) => println!("{}", output::format_unreadable(&locator, &e)),
                }
            }
            return Ok(());
        }
        Command::Postprocess {
            batch,
            max_dimension,
            dpi,
            padding,
            threshold,
            allow_upscale,
        } => {
            let p = &mut cfg.postprocess;
            override_with(&mut p.max_dimension, max_dimension);
            override_with(&mut p.dpi, dpi);
            override_with(&mut p.autocrop_padding, padding);
            override_with(&mut p.alpha_threshold, threshold);
            p.allow_upscale |= allow_upscale;
            override_with(&mut cfg.software, batch.software.clone());
            cfg.validate()?;
            (batch, Pipeline::Postprocess(cfg.postprocess_params()))
        }
        Command::Resize { batch, factor, dpi } => {
            override_with(&mut cfg.resize.factor, factor);
            override_with(&mut cfg.resize.dpi, dpi);
            override_with(&mut cfg.software, batch.software.clone());
            cfg.validate()?;
            (batch, Pipeline::Resize(cfg.resize_params()))
        }
        Command::Autocrop {
            batch,
            padding,
            threshold,
            dpi,
            stable,
        } => {
            let a = &mut cfg.autocrop;
            override_with(&mut a.padding, padding);
            override_with(&mut a.alpha_threshold, threshold);
            override_with(&mut a.dpi, dpi);
            a.stable |= stable;
            override_with(&mut cfg.software, batch.software.clone());
            cfg.validate()?;
            let pipeline = Pipeline::Autocrop {
                params: cfg.autocrop_params(),
                dpi: cfg.autocrop_dpi(),
                software: cfg.software.clone(),
            };
            (batch, pipeline)
        }
    };

    init_thread_pool(&cfg.processing);
    let sources = collect_sources(&batch.inputs)?;
    debug!(count = sources.len(), "sources collected");
    let storage = FsStorage::new(&cli.output);

    let report = run_batch(&storage, &sources, &batch.select, &pipeline)?;
    output::print_batch_summary(&report, storage.output_dir());

    if let Some(path) = &batch.report {
        std::fs::write(path, report.to_json()?)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Run a batch with a printer thread draining progress events.
fn run_batch(
    storage: &FsStorage,
    sources: &[String],
    selected: &[i64],
    pipeline: &Pipeline,
) -> Result<BatchReport, process::ProcessError> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process(storage, sources, selected, pipeline, Some(tx));
    // The sender is dropped with the batch, so the printer always finishes.
    printer.join().ok();
    result
}

/// Logs go to stderr so stdout stays clean for listings.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    debug!(threads, "initializing thread pool");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
