//! End-to-end runs of each pipeline through the real backend and the
//! filesystem storage.
//!
//! Run with: cargo test --test pipeline

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use pngtrim::config::Config;
use pngtrim::png::{PngStream, read_resolution, set_dpi, software_tag};
use pngtrim::process::{self, Pipeline, ProcessError};
use pngtrim::storage::{FsStorage, collect_sources};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

/// 200x100 canvas, opaque 40x20 block at (50, 30), transparent elsewhere.
fn write_padded_png(path: &Path) {
    let img: RgbaImage = ImageBuffer::from_fn(200, 100, |x, y| {
        if (50..90).contains(&x) && (30..50).contains(&y) {
            Rgba([10, 120, 200, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 50, 50]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    std::fs::write(path, buf.into_inner()).unwrap();
}

fn decoded_size(path: &str) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

#[test]
fn postprocess_trims_fits_and_stamps() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("logo.png");
    write_padded_png(&src);
    let out = tmp.path().join("out");

    let mut config = Config::default();
    config.postprocess.max_dimension = 80;
    config.postprocess.allow_upscale = true;
    let pipeline = Pipeline::Postprocess(config.postprocess_params());

    let sources = collect_sources(&[src]).unwrap();
    let report = process::process(&FsStorage::new(&out), &sources, &[], &pipeline, None).unwrap();

    assert_eq!(report.images.len(), 1);
    let image = &report.images[0];
    assert_eq!(image.original_index, 1);
    assert!(image.was_cropped);
    assert!(image.was_resized);
    assert_eq!((image.cropped_width, image.cropped_height), (40, 20));
    assert_eq!((image.width, image.height), (80, 40));
    assert!(image.output.ends_with("logo-80-300dpi.png"));

    let bytes = std::fs::read(&image.output).unwrap();
    let res = read_resolution(&bytes).unwrap().unwrap();
    assert_eq!((res.ppu_x, res.ppu_y, res.unit), (11811, 11811, 1));
    assert_eq!(
        software_tag(&bytes).unwrap().as_deref(),
        Some("Image Processor Engine")
    );
    assert!(PngStream::parse(&bytes).unwrap().validate().is_ok());
    assert_eq!(decoded_size(&image.output), (80, 40));
}

#[test]
fn resize_scales_jpeg_input() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("photo.jpg");
    write_jpeg(&src, 30, 20);
    let out = tmp.path().join("out");

    let mut config = Config::default();
    config.resize.factor = 1.5;
    config.resize.dpi = 72.0;
    let pipeline = Pipeline::Resize(config.resize_params());

    let sources = vec![src.to_string_lossy().into_owned()];
    let report = process::process(&FsStorage::new(&out), &sources, &[], &pipeline, None).unwrap();

    let image = &report.images[0];
    assert!(image.output.ends_with("photo-x1.5.png"));
    assert_eq!((image.width, image.height), (45, 30));
    let bytes = std::fs::read(&image.output).unwrap();
    assert_eq!(read_resolution(&bytes).unwrap().unwrap().ppu_x, 2835);
}

#[test]
fn autocrop_selection_and_report() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("in");
    std::fs::create_dir(&dir).unwrap();
    write_padded_png(&dir.join("a.png"));
    write_padded_png(&dir.join("b.png"));
    std::fs::write(dir.join("readme.txt"), "not an image").unwrap();
    let out = tmp.path().join("out");

    let config = Config::default();
    let pipeline = Pipeline::Autocrop {
        params: config.autocrop_params(),
        dpi: config.autocrop_dpi(),
        software: "Tests".to_string(),
    };

    let sources = collect_sources(&[dir]).unwrap();
    assert_eq!(sources.len(), 2);
    let report = process::process(&FsStorage::new(&out), &sources, &[2], &pipeline, None).unwrap();

    assert_eq!(report.images.len(), 1);
    assert_eq!(report.images[0].original_index, 2);
    assert!(out.join("b-cropped.png").exists());
    assert!(!out.join("a-cropped.png").exists());
    assert_eq!(decoded_size(&report.images[0].output), (40, 20));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["pipeline"], "autocrop");
    assert_eq!(json["images"][0]["original_index"], 2);
    assert_eq!(json["images"][0]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn undecodable_source_fails_batch() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("good.png");
    write_padded_png(&good);
    let bad = tmp.path().join("bad.png");
    std::fs::write(&bad, b"definitely not a png").unwrap();

    let sources = collect_sources(&[good, bad]).unwrap();
    let pipeline = Pipeline::Postprocess(Config::default().postprocess_params());
    let result = process::process(
        &FsStorage::new(tmp.path().join("out")),
        &sources,
        &[],
        &pipeline,
        None,
    );

    match result {
        Err(ProcessError::Imaging { locator, .. }) => assert!(locator.ends_with("bad.png")),
        other => panic!("expected imaging error, got {other:?}"),
    }
}

#[test]
fn restamping_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("logo.png");
    write_padded_png(&src);
    let original = std::fs::read(&src).unwrap();

    let once = set_dpi(&original, 300.0).unwrap();
    let twice = set_dpi(&once, 300.0).unwrap();
    assert_eq!(once, twice);

    let phys_count = PngStream::parse(&twice)
        .unwrap()
        .chunks
        .iter()
        .filter(|c| c.chunk_type.to_string() == "pHYs")
        .count();
    assert_eq!(phys_count, 1);
}
