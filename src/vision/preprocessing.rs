// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload preprocessing: bound the dimensions, persist, base64-encode

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::image_utils::{extension_to_mime, format_to_extension, ImageError};

/// Default bounding box, matching what the vision endpoint handles comfortably
pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const DEFAULT_MAX_HEIGHT: u32 = 800;

/// Longest file stem carried over from the upload name
const MAX_STEM_LEN: usize = 48;

/// A decoded image whose dimensions fit the configured bounds
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    image: DynamicImage,
    format: ImageFormat,
}

impl ProcessedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Format the upload arrived in; persisting re-encodes in this format
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Base64 text of a persisted image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame the payload as a `data:` URL with the given MIME type
    pub fn to_data_url(&self, mime: &str) -> String {
        format!("data:{};base64,{}", mime, self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Compute the dimensions of `width`x`height` scaled down to fit the bounds
///
/// Thumbnail semantics: the limiting axis lands exactly on its bound, the
/// other axis is rounded and never drops below one pixel. Dimensions that
/// already fit are returned unchanged.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale_w = max_width as f64 / width as f64;
    let scale_h = max_height as f64 / height as f64;

    if scale_w <= scale_h {
        let new_h = (height as f64 * scale_w).round() as u32;
        (max_width, new_h.clamp(1, max_height))
    } else {
        let new_w = (width as f64 * scale_h).round() as u32;
        (new_w.clamp(1, max_width), max_height)
    }
}

/// Downscale `image` so both dimensions fit within the bounds
///
/// Never upscales. `format` records the source encoding so the image can be
/// persisted the way it was uploaded.
pub fn resize(
    image: DynamicImage,
    format: ImageFormat,
    max_width: u32,
    max_height: u32,
) -> Result<ProcessedImage, ImageError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    if max_width == 0 || max_height == 0 {
        return Err(ImageError::InvalidDimensions {
            width: max_width,
            height: max_height,
        });
    }

    let (new_w, new_h) = fit_within(width, height, max_width, max_height);
    if (new_w, new_h) == (width, height) {
        return Ok(ProcessedImage { image, format });
    }

    debug!(
        "Resizing image {}x{} -> {}x{} (bound {}x{})",
        width, height, new_w, new_h, max_width, max_height
    );
    let image = image.resize_exact(new_w, new_h, FilterType::Lanczos3);

    Ok(ProcessedImage { image, format })
}

/// Write `image` to `directory/filename` in its original format
///
/// Creates the directory when missing and overwrites an existing file.
pub fn persist(image: &ProcessedImage, directory: &Path, filename: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(directory)?;

    let mut buf = Vec::new();
    image
        .image
        .write_to(&mut Cursor::new(&mut buf), image.format)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => io,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        })?;

    let path = directory.join(filename);
    std::fs::write(&path, &buf)?;
    debug!("Persisted {} bytes to {}", buf.len(), path.display());

    Ok(path)
}

/// Read the file at `path` and return its base64 encoding
pub fn encode(path: &Path) -> std::io::Result<EncodedPayload> {
    let bytes = std::fs::read(path)?;
    Ok(EncodedPayload(STANDARD.encode(bytes)))
}

/// Unique scratch file name for one pipeline invocation
///
/// Combines the sanitised upload stem, a content hash prefix and a fresh
/// invocation id, so identical upload names never share a path.
pub fn scratch_file_name(bytes: &[u8], original_name: &str, format: ImageFormat) -> String {
    let digest = Sha256::digest(bytes);
    let hash = hex::encode(&digest[..8]);
    let invocation = uuid::Uuid::new_v4().simple().to_string();

    format!(
        "{}-{}-{}.{}",
        sanitize_stem(original_name),
        hash,
        &invocation[..12],
        format_to_extension(format)
    )
}

/// Delete persisted images in `directory` whose age is at least `max_age`
///
/// Only files with an image extension are touched. A missing directory is
/// not an error. Returns the number of files removed.
pub fn prune_scratch(directory: &Path, max_age: Duration) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(extension_to_mime)
            .is_some();
        let metadata = entry.metadata()?;
        if !metadata.is_file() || !is_image {
            continue;
        }

        // mtime in the future counts as fresh
        let age = match metadata.modified()?.elapsed() {
            Ok(age) => age,
            Err(_) => continue,
        };
        if age >= max_age {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // A concurrent prune got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
    }

    if removed > 0 {
        info!("Pruned {} expired scratch images from {}", removed, directory.display());
    }
    Ok(removed)
}

fn sanitize_stem(original_name: &str) -> String {
    // Only the final path component counts; browsers may send full paths
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_STEM_LEN)
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
