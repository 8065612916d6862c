// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Preprocessing tests: bounded resize, persist to scratch, base64 encode

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::support::{gradient, jpeg_bytes, png_bytes};
use vision_storyteller::vision::{
    decode_image_bytes, encode, persist, resize, scratch_file_name, ImageError,
    DEFAULT_MAX_UPLOAD_BYTES,
};

#[test]
fn test_large_upload_is_bounded_persisted_and_encoded() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("temp_images");
    let upload = png_bytes(1600, 1200);

    let (decoded, info) = decode_image_bytes(&upload, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
    assert_eq!((info.width, info.height), (1600, 1200));

    let processed = resize(decoded, info.format, 800, 800).unwrap();
    assert_eq!((processed.width(), processed.height()), (800, 600));

    let name = scratch_file_name(&upload, "dog.png", info.format);
    let path = persist(&processed, &scratch, &name).unwrap();
    assert_eq!(path, scratch.join(&name));
    assert!(scratch.is_dir());

    let payload = encode(&path).unwrap();
    assert!(!payload.is_empty());
    let round_trip = STANDARD.decode(payload.as_str()).unwrap();
    assert_eq!(round_trip, std::fs::read(&path).unwrap());

    // The persisted file is a PNG of the resized dimensions
    let (reloaded, reloaded_info) = decode_image_bytes(&round_trip, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
    assert_eq!(reloaded_info.format, ImageFormat::Png);
    assert_eq!((reloaded.width(), reloaded.height()), (800, 600));
}

#[test]
fn test_images_within_bound_keep_their_dimensions() {
    for (w, h) in [(1, 1), (800, 800), (640, 480), (10, 799), (800, 1)] {
        let processed = resize(gradient(w, h), ImageFormat::Png, 800, 800).unwrap();
        assert_eq!(
            (processed.width(), processed.height()),
            (w, h),
            "{}x{} should not be resized",
            w,
            h
        );
    }
}

#[test]
fn test_oversized_images_fit_and_keep_aspect_ratio() {
    for (w, h) in [(1600, 1200), (801, 800), (3000, 1000), (1000, 3000), (2048, 2048), (1234, 567)] {
        let processed = resize(gradient(w, h), ImageFormat::Png, 800, 800).unwrap();
        let (nw, nh) = (processed.width(), processed.height());

        assert!(nw <= 800 && nh <= 800, "{}x{} -> {}x{}", w, h, nw, nh);
        assert!(nw == 800 || nh == 800, "limiting axis should hit the bound");

        let original = w as f64 / h as f64;
        let resized = nw as f64 / nh as f64;
        // One pixel of rounding on the shorter side
        let tolerance = original / nh.min(nw) as f64 + 0.01;
        assert!(
            (original - resized).abs() <= tolerance,
            "{}x{} -> {}x{} changed aspect ratio",
            w,
            h,
            nw,
            nh
        );
    }
}

#[test]
fn test_preprocessing_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let upload = jpeg_bytes(1200, 900);

    let run = |name: &str| {
        let (decoded, info) = decode_image_bytes(&upload, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
        let processed = resize(decoded, info.format, 800, 800).unwrap();
        let path = persist(&processed, dir.path(), name).unwrap();
        encode(&path).unwrap()
    };

    assert_eq!(run("first.jpg"), run("second.jpg"));
}

#[test]
fn test_persist_keeps_original_format() {
    let dir = tempfile::tempdir().unwrap();
    let upload = jpeg_bytes(400, 300);

    let (decoded, info) = decode_image_bytes(&upload, DEFAULT_MAX_UPLOAD_BYTES).unwrap();
    assert_eq!(info.format, ImageFormat::Jpeg);
    let processed = resize(decoded, info.format, 800, 800).unwrap();
    let path = persist(&processed, dir.path(), "photo.jpg").unwrap();

    let written = std::fs::read(path).unwrap();
    assert_eq!(&written[..3], &[0xFF, 0xD8, 0xFF]);
}

#[test]
fn test_persist_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("same.png");
    std::fs::write(&target, b"stale contents").unwrap();

    let processed = resize(gradient(20, 10), ImageFormat::Png, 800, 800).unwrap();
    let path = persist(&processed, dir.path(), "same.png").unwrap();

    let written = std::fs::read(path).unwrap();
    assert_ne!(written, b"stale contents");
    assert_eq!(&written[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_persist_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b").join("c");

    let processed = resize(gradient(5, 5), ImageFormat::Png, 800, 800).unwrap();
    let path = persist(&processed, &nested, "x.png").unwrap();
    assert!(path.exists());
}

#[test]
fn test_encode_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = encode(&dir.path().join("nope.png")).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn test_corrupted_upload_is_decode_error() {
    let mut upload = png_bytes(64, 64);
    upload.truncate(40);
    let err = decode_image_bytes(&upload, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
    assert!(matches!(err, ImageError::DecodeFailed(_)), "got {:?}", err);
}
