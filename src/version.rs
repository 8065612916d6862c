// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for Vision Storyteller

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-vision-story-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "image-upload",
    "thumbnail-resize",
    "vision-description",
    "story-generation",
    "unique-scratch-files",
    "bounded-retry",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Vision Storyteller {} ({})", VERSION_NUMBER, BUILD_DATE)
}
