// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Short story generation from an image description

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::client::ChatCompletion;
use super::types::{ChatMessage, ChatRequest, InferenceError};

pub const STORY_SYSTEM_PROMPT: &str = "You are a children's book author. Write a short story about the scene depicted in this image.";

/// Result from a story generation call
#[derive(Debug, Clone)]
pub struct StoryResult {
    pub story: String,
    pub model: String,
    pub processing_time_ms: u64,
    pub tokens_used: u32,
}

pub struct StoryGenerator {
    client: Arc<dyn ChatCompletion>,
    model: String,
}

impl StoryGenerator {
    pub fn new(client: Arc<dyn ChatCompletion>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System persona, then the description verbatim as the user turn
    pub fn build_request(&self, description: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(STORY_SYSTEM_PROMPT),
                ChatMessage::user(description),
            ],
            max_tokens: None,
            temperature: None,
        }
    }

    pub async fn generate(&self, description: &str) -> Result<StoryResult, InferenceError> {
        let start = Instant::now();
        let response = self.client.complete(self.build_request(description)).await?;
        let story = response.first_text(&self.model)?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Story generated by {} in {}ms ({} chars)",
            self.model,
            processing_time_ms,
            story.len()
        );

        Ok(StoryResult {
            story,
            model: self.model.clone(),
            processing_time_ms,
            tokens_used: response.total_tokens(),
        })
    }
}
