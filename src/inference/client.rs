// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client for the hosted OpenAI-compatible chat-completions API

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ChatRequest, ChatResponse, InferenceError};
use crate::config::InferenceConfig;

/// Anything that can answer a chat-completion request
///
/// The pipeline only talks to the endpoint through this trait, so tests can
/// drive it with in-process doubles.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError>;
}

/// HTTP client for Groq (or any OpenAI-compatible endpoint)
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
}

impl GroqClient {
    /// Create a new client from the inference configuration
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Configuration(e.to_string()))?;

        let endpoint = config.base_url.trim_end_matches('/').to_string();
        info!(
            "Inference client configured: endpoint={}, timeout={}s, max_retries={}",
            endpoint, config.timeout_secs, config.max_retries
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                InferenceError::InvalidResponse(e.to_string())
            }
        })
    }

    fn classify(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            InferenceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ChatCompletion for GroqClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        let mut attempt = 0;
        loop {
            debug!(
                "Sending chat completion: model={}, messages={}, attempt={}",
                request.model,
                request.messages.len(),
                attempt + 1
            );

            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Transient inference failure for model {} ({}), retrying in {:?}",
                        request.model, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
