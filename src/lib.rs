// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod inference;
pub mod pipeline;
pub mod version;
pub mod vision;

pub use config::{ConfigError, StorytellerConfig};
pub use inference::{ChatCompletion, GroqClient, InferenceError};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput, UploadedImage};
