// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image description via a vision-capable model

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::client::ChatCompletion;
use super::types::{ChatMessage, ChatRequest, ContentPart, ImageUrl, InferenceError};
use crate::vision::EncodedPayload;

/// Instruction sent alongside the image
pub const DESCRIBE_PROMPT: &str = "Describe this image in detail, including the appearance of the dog(s) and any notable actions or behaviors.";

/// Result from a vision description call
#[derive(Debug, Clone)]
pub struct DescribeResult {
    pub description: String,
    pub model: String,
    pub processing_time_ms: u64,
    pub tokens_used: u32,
}

pub struct VisionDescriber {
    client: Arc<dyn ChatCompletion>,
    model: String,
    image_mime: String,
}

impl VisionDescriber {
    pub fn new(client: Arc<dyn ChatCompletion>, model: &str, image_mime: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            image_mime: image_mime.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the single-turn request: instruction text plus the image data URL
    pub fn build_request(&self, payload: &EncodedPayload, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: payload.to_data_url(&self.image_mime),
                    },
                },
            ])],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Describe the encoded image
    ///
    /// Fails with [`InferenceError::EmptyResponse`] when the model returns no
    /// choices. Errors are not retried here; the client owns retry policy.
    pub async fn describe(
        &self,
        payload: &EncodedPayload,
        prompt: &str,
    ) -> Result<DescribeResult, InferenceError> {
        let start = Instant::now();
        let request = self.build_request(payload, prompt);

        let response = self.client.complete(request).await?;
        let description = response.first_text(&self.model)?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Image described by {} in {}ms ({} chars)",
            self.model,
            processing_time_ms,
            description.len()
        );

        Ok(DescribeResult {
            description,
            model: self.model.clone(),
            processing_time_ms,
            tokens_used: response.total_tokens(),
        })
    }
}
