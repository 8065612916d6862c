// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload → description → story
//!
//! One [`Pipeline::run`] call is one invocation: decode, resize, persist,
//! encode, describe, generate. Each stage needs the previous one's output, so
//! the stages run strictly in order and the first failure ends the
//! invocation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ImageConfig, StorytellerConfig};
use crate::inference::{
    ChatCompletion, InferenceError, StoryGenerator, VisionDescriber, DESCRIBE_PROMPT,
};
use crate::vision::{self, EncodedPayload, ImageError};

/// An image as received from the user
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// MIME type declared by the client; informational only
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Remote stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Describe,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Describe => write!(f, "describe"),
            Stage::Generate => write!(f, "generate"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not decode upload: {0}")]
    Decode(#[from] ImageError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Inference failed during {stage}: {source}")]
    Inference {
        stage: Stage,
        #[source]
        source: InferenceError,
    },

    #[error("Preprocessing task failed: {0}")]
    Task(String),
}

/// Where the resized image ended up
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImageInfo {
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub path: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub preprocess_ms: u64,
    pub describe_ms: u64,
    pub generate_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub description: String,
    pub story: String,
    pub image: ProcessedImageInfo,
    pub vision_model: String,
    pub text_model: String,
    pub timings: StageTimings,
    pub tokens_used: u32,
}

/// Output of the local stages, ready for the vision call
#[derive(Debug)]
pub struct Preprocessed {
    pub image: ProcessedImageInfo,
    pub payload: EncodedPayload,
}

/// Decode, resize, persist and encode one upload
///
/// Expired scratch files are pruned before the new one is written.
///
/// Blocking; callers on the async runtime should go through
/// [`Pipeline::run`], which moves this onto the blocking pool.
pub fn preprocess(upload: &UploadedImage, config: &ImageConfig) -> Result<Preprocessed, PipelineError> {
    let (decoded, info) = vision::decode_image_bytes(&upload.bytes, config.max_upload_bytes)?;
    debug!(
        "Decoded {} ({:?}, {}x{}, {} bytes, declared {:?})",
        upload.filename,
        info.format,
        info.width,
        info.height,
        info.size_bytes,
        upload.content_type
    );

    let processed = vision::resize(decoded, info.format, config.max_width, config.max_height)?;

    if config.scratch_ttl_secs > 0 {
        let ttl = Duration::from_secs(config.scratch_ttl_secs);
        // Cleanup trouble never fails the upload
        if let Err(e) = vision::prune_scratch(&config.scratch_dir, ttl) {
            warn!("Scratch cleanup in {} failed: {}", config.scratch_dir.display(), e);
        }
    }

    let file_name = vision::scratch_file_name(&upload.bytes, &upload.filename, info.format);
    let path = vision::persist(&processed, &config.scratch_dir, &file_name).map_err(|source| {
        PipelineError::Io {
            path: config.scratch_dir.join(&file_name),
            source,
        }
    })?;

    let payload = vision::encode(&path).map_err(|source| PipelineError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(Preprocessed {
        image: ProcessedImageInfo {
            width: processed.width(),
            height: processed.height(),
            original_width: info.width,
            original_height: info.height,
            path,
            file_name,
        },
        payload,
    })
}

/// The two-stage inference pipeline with image preprocessing
pub struct Pipeline {
    describer: VisionDescriber,
    generator: StoryGenerator,
    image: ImageConfig,
    prompt: String,
}

impl Pipeline {
    pub fn new(config: &StorytellerConfig, client: Arc<dyn ChatCompletion>) -> Self {
        let inference = &config.inference;
        Self {
            describer: VisionDescriber::new(
                client.clone(),
                &inference.vision_model,
                &inference.vision_image_mime,
            ),
            generator: StoryGenerator::new(client, &inference.text_model),
            image: config.image.clone(),
            prompt: DESCRIBE_PROMPT.to_string(),
        }
    }

    /// Replace the instruction sent with the image
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn image_config(&self) -> &ImageConfig {
        &self.image
    }

    pub fn vision_model(&self) -> &str {
        self.describer.model()
    }

    pub fn text_model(&self) -> &str {
        self.generator.model()
    }

    /// Run one invocation end to end
    pub async fn run(&self, upload: UploadedImage) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        let filename = upload.filename.clone();
        let image_config = self.image.clone();

        let preprocessed = tokio::task::spawn_blocking(move || preprocess(&upload, &image_config))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(|e| {
                warn!("Preprocessing {} failed: {}", filename, e);
                e
            })?;
        let preprocess_ms = start.elapsed().as_millis() as u64;

        info!(
            "Preprocessed {} -> {} ({}x{}, payload {} chars)",
            filename,
            preprocessed.image.file_name,
            preprocessed.image.width,
            preprocessed.image.height,
            preprocessed.payload.len()
        );

        let described = self
            .describer
            .describe(&preprocessed.payload, &self.prompt)
            .await
            .map_err(|source| PipelineError::Inference {
                stage: Stage::Describe,
                source,
            })?;

        let story = self
            .generator
            .generate(&described.description)
            .await
            .map_err(|source| PipelineError::Inference {
                stage: Stage::Generate,
                source,
            })?;

        info!(
            "Pipeline for {} finished in {}ms",
            filename,
            start.elapsed().as_millis()
        );

        Ok(PipelineOutput {
            description: described.description,
            story: story.story,
            image: preprocessed.image,
            vision_model: described.model,
            text_model: story.model,
            timings: StageTimings {
                preprocess_ms,
                describe_ms: described.processing_time_ms,
                generate_ms: story.processing_time_ms,
            },
            tokens_used: described.tokens_used.saturating_add(story.tokens_used),
        })
    }
}
