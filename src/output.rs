//! CLI output formatting.
//!
//! Every display is a pure `format_*` function returning lines, with a thin
//! `print_*` wrapper, so the exact text is unit-testable. Logs go to stderr
//! through `tracing`; these lines are the user-facing stdout.
//!
//! # Output Format
//!
//! ## Batch progress
//!
//! ```text
//! postprocess (3 images)
//!     001 logo.png
//!         → out/logo-2048-300dpi.png
//!         512x384 (cropped, resized)
//! ```
//!
//! ## Batch summary
//!
//! ```text
//! 3 images → out/
//!     001 logo.png  512x384  9f86d081…
//! ```
//!
//! ## Inspect
//!
//! ```text
//! logo.png  512x384
//!     000 IHDR      13 bytes  crc ok
//!     001 pHYs       9 bytes  crc ok
//!     ...
//!     Resolution: 300 x 300 dpi
//!     Software: Image Processor Engine
//!     Structure: ok
//! photo.jpg  not a PNG: missing PNG signature
//! ```

use crate::png::PngStream;
use crate::process::{BatchReport, ProcessEvent};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name of a locator, or the whole locator if it has none.
fn display_name(locator: &str) -> String {
    Path::new(locator)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| locator.to_string())
}

fn changes(was_cropped: bool, was_resized: bool) -> &'static str {
    match (was_cropped, was_resized) {
        (true, true) => "cropped, resized",
        (true, false) => "cropped",
        (false, true) => "resized",
        (false, false) => "unchanged",
    }
}

/// Round a DPI value for display; whole numbers print without decimals.
fn format_dpi(dpi: f64) -> String {
    let rounded = (dpi * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.2}", rounded)
    }
}

// ============================================================================
// Batch output
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted {
            pipeline,
            image_count,
        } => {
            let noun = if *image_count == 1 { "image" } else { "images" };
            vec![format!("{} ({} {})", pipeline, image_count, noun)]
        }
        ProcessEvent::ImageProcessed {
            index,
            source,
            output,
            width,
            height,
            was_cropped,
            was_resized,
        } => vec![
            format!("{}{} {}", indent(1), format_index(*index), display_name(source)),
            format!("{}→ {}", indent(2), output),
            format!(
                "{}{}x{} ({})",
                indent(2),
                width,
                height,
                changes(*was_cropped, *was_resized)
            ),
        ],
    }
}

/// Summary of a finished batch: one line per output with a short digest.
pub fn format_batch_summary(report: &BatchReport, output_dir: &Path) -> Vec<String> {
    let noun = if report.images.len() == 1 {
        "image"
    } else {
        "images"
    };
    let mut lines = vec![format!(
        "{} {} → {}",
        report.images.len(),
        noun,
        output_dir.display()
    )];
    for image in &report.images {
        let short = image.sha256.get(..8).unwrap_or(&image.sha256);
        lines.push(format!(
            "{}{} {}  {}x{}  {}…",
            indent(1),
            format_index(image.original_index),
            display_name(&image.source),
            image.width,
            image.height,
            short
        ));
    }
    lines
}

pub fn print_batch_summary(report: &BatchReport, output_dir: &Path) {
    for line in format_batch_summary(report, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect output
// ============================================================================

/// Chunk listing plus decoded metadata for one PNG.
pub fn format_inspect(locator: &str, stream: &PngStream) -> Vec<String> {
    let header = match stream.dimensions() {
        Some((w, h)) => format!("{}  {}x{}", display_name(locator), w, h),
        None => display_name(locator),
    };
    let mut lines = vec![header];

    for (i, chunk) in stream.chunks.iter().enumerate() {
        let crc = if chunk.crc_matches() { "ok" } else { "MISMATCH" };
        lines.push(format!(
            "{}{} {:<4} {:>9} bytes  crc {}",
            indent(1),
            format_index(i),
            chunk.chunk_type.to_string(),
            chunk.data.len(),
            crc
        ));
    }

    let resolution = match stream.resolution() {
        Some(res) => match res.dpi() {
            Some((x, y)) => format!("{} x {} dpi", format_dpi(x), format_dpi(y)),
            None => format!("{} x {} (unit {})", res.ppu_x, res.ppu_y, res.unit),
        },
        None => "none".to_string(),
    };
    lines.push(format!("{}Resolution: {}", indent(1), resolution));
    lines.push(format!(
        "{}Software: {}",
        indent(1),
        stream.software().as_deref().unwrap_or("none")
    ));

    let structure = match stream.validate() {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };
    lines.push(format!("{}Structure: {}", indent(1), structure));
    lines
}

/// Listing for raw file bytes. Files that are not PNGs get a single line
/// naming the problem, so a mixed directory can be inspected in one run.
pub fn format_inspect_bytes(locator: &str, bytes: &[u8]) -> Vec<String> {
    match PngStream::parse(bytes) {
        Ok(stream) => format_inspect(locator, &stream),
        Err(e) => vec![format_inspect_error(locator, &e)],
    }
}

fn format_inspect_error(locator: &str, error: &dyn std::fmt::Display) -> String {
    format!("{}  not a PNG: {}", display_name(locator), error)
}

pub fn print_inspect(locator: &str, bytes: &[u8]) {
    for line in format_inspect_bytes(locator, bytes) {
        println!("{}", line);
    }
}

/// Line for a file that could not be read at all.
pub fn format_unreadable(locator: &str, error: &dyn std::fmt::Display) -> String {
    format!("{}  unreadable: {}", display_name(locator), error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::BoundingBox;
    use crate::png::{set_dpi, set_software_tag};
    use crate::process::ImageReport;
    use crate::test_helpers::minimal_png;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn display_name_takes_file_name() {
        assert_eq!(display_name("a/b/logo.png"), "logo.png");
        assert_eq!(display_name("/"), "/");
    }

    #[test]
    fn format_dpi_rounds() {
        assert_eq!(format_dpi(299.9994), "300");
        assert_eq!(format_dpi(72.009), "72.01");
    }

    // =========================================================================
    // Batch output tests
    // =========================================================================

    #[test]
    fn format_batch_started() {
        let event = ProcessEvent::BatchStarted {
            pipeline: "resize",
            image_count: 1,
        };
        assert_eq!(format_process_event(&event), vec!["resize (1 image)"]);
    }

    #[test]
    fn format_image_processed() {
        let event = ProcessEvent::ImageProcessed {
            index: 2,
            source: "in/logo.png".to_string(),
            output: "out/logo-cropped.png".to_string(),
            width: 40,
            height: 30,
            was_cropped: true,
            was_resized: false,
        };
        let lines = format_process_event(&event);
        assert_eq!(lines[0], "    002 logo.png");
        assert_eq!(lines[1], "        → out/logo-cropped.png");
        assert_eq!(lines[2], "        40x30 (cropped)");
    }

    #[test]
    fn format_summary_lists_images() {
        let report = BatchReport {
            pipeline: "autocrop".to_string(),
            settings: serde_json::json!({}),
            images: vec![ImageReport {
                original_index: 3,
                source: "in/a.png".to_string(),
                output: "out/a-cropped.png".to_string(),
                width: 10,
                height: 5,
                crop_bounds: BoundingBox::full_frame(10, 5),
                cropped_width: 10,
                cropped_height: 5,
                was_cropped: false,
                was_resized: false,
                scale: 1.0,
                sha256: "0123456789abcdef".to_string(),
            }],
        };
        let lines = format_batch_summary(&report, Path::new("out"));
        assert_eq!(lines[0], "1 image → out");
        assert_eq!(lines[1], "    003 a.png  10x5  01234567…");
    }

    // =========================================================================
    // Inspect tests
    // =========================================================================

    #[test]
    fn inspect_plain_png() {
        let stream = PngStream::parse(&minimal_png()).unwrap();
        let lines = format_inspect("dir/red.png", &stream);

        assert_eq!(lines[0], "red.png  1x1");
        assert!(lines[1].contains("000 IHDR"));
        assert!(lines[1].ends_with("13 bytes  crc ok"));
        assert!(lines[3].contains("IEND"));
        assert_eq!(lines[4], "    Resolution: none");
        assert_eq!(lines[5], "    Software: none");
        assert_eq!(lines[6], "    Structure: ok");
    }

    #[test]
    fn inspect_stamped_png() {
        let png = set_software_tag(&set_dpi(&minimal_png(), 300.0).unwrap(), "Engine").unwrap();
        let stream = PngStream::parse(&png).unwrap();
        let lines = format_inspect("red.png", &stream);

        assert!(lines[2].contains("pHYs"));
        assert!(lines.contains(&"    Resolution: 300 x 300 dpi".to_string()));
        assert!(lines.contains(&"    Software: Engine".to_string()));
    }

    #[test]
    fn inspect_reports_non_png_on_one_line() {
        let lines = format_inspect_bytes("in/photo.jpg", b"\xFF\xD8\xFF\xE0 jpeg body");
        assert_eq!(lines, vec!["photo.jpg  not a PNG: missing PNG signature"]);
    }

    #[test]
    fn inspect_bytes_lists_png_chunks() {
        let lines = format_inspect_bytes("red.png", &minimal_png());
        assert_eq!(lines[0], "red.png  1x1");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn unreadable_line_names_file() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(format_unreadable("a/b.png", &err).starts_with("b.png  unreadable: "));
    }

    #[test]
    fn inspect_flags_bad_crc() {
        let mut png = minimal_png();
        let last = png.len() - 1;
        png[last] ^= 0xFF; // IEND CRC
        let stream = PngStream::parse(&png).unwrap();
        let lines = format_inspect("red.png", &stream);
        assert!(lines[3].ends_with("crc MISMATCH"));
    }
}
