// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the storytelling pipeline
//!
//! This module provides:
//! - Upload decoding with format detection from magic bytes
//! - Thumbnail-style downscaling to a bounding box
//! - Persisting to a scratch directory and base64 encoding for the vision call
//! - Age-based pruning of the scratch directory

pub mod image_utils;
pub mod preprocessing;

pub use image_utils::{
    decode_image_bytes, detect_format, extension_to_mime, format_to_extension, ImageError,
    ImageInfo, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use preprocessing::{
    encode, fit_within, persist, prune_scratch, resize, scratch_file_name, EncodedPayload,
    ProcessedImage, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH,
};
