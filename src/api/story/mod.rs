// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Story API endpoint module
//!
//! Provides POST /v1/story: multipart image upload in, description and story out.

pub mod handler;
pub mod response;

pub use handler::story_handler;
pub use response::{ImageSummary, StoryResponse, Timings};
