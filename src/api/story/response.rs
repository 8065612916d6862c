// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Story endpoint response types

use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelineOutput, StageTimings};

/// Resized image as seen by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    /// Scratch file name
    pub file_name: String,
    /// Where the resized image can be fetched from
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub preprocess_ms: u64,
    pub describe_ms: u64,
    pub generate_ms: u64,
}

impl From<StageTimings> for Timings {
    fn from(t: StageTimings) -> Self {
        Self {
            preprocess_ms: t.preprocess_ms,
            describe_ms: t.describe_ms,
            generate_ms: t.generate_ms,
        }
    }
}

/// Response from POST /v1/story
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub description: String,
    pub story: String,
    pub image: ImageSummary,
    pub vision_model: String,
    pub text_model: String,
    pub timings: Timings,
    pub tokens_used: u32,
}

impl From<PipelineOutput> for StoryResponse {
    fn from(output: PipelineOutput) -> Self {
        let url = format!("/v1/images/{}", output.image.file_name);
        Self {
            description: output.description,
            story: output.story,
            image: ImageSummary {
                width: output.image.width,
                height: output.image.height,
                original_width: output.image.original_width,
                original_height: output.image.original_height,
                file_name: output.image.file_name,
                url,
            },
            vision_model: output.vision_model,
            text_model: output.text_model,
            timings: output.timings.into(),
            tokens_used: output.tokens_used,
        }
    }
}
