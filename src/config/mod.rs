// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration, loaded once at startup
//!
//! Values come from the environment (after an optional `.env` file has been
//! loaded by the binary). Everything the pipeline needs is carried in
//! [`StorytellerConfig`] and passed in explicitly; nothing is read from the
//! environment after startup.

use std::env;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::vision::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_WIDTH};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_VISION_MODEL: &str = "llama-3.2-11b-vision-preview";
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_VISION_IMAGE_MIME: &str = "image/jpeg";
pub const DEFAULT_SCRATCH_DIR: &str = "temp_images";
/// Persisted images older than this are pruned (1 hour)
pub const DEFAULT_SCRATCH_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GROQ_API_KEY is not set; it is required to call the inference endpoint")]
    MissingApiKey,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Inference endpoint and model selection
#[derive(Clone)]
pub struct InferenceConfig {
    /// Bearer credential for the endpoint
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
    /// MIME type used to frame the image data URL
    pub vision_image_mime: String,
    pub timeout_secs: u64,
    /// Retries for transient failures; 0 disables retrying
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl InferenceConfig {
    /// Defaults for everything except the credential
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_image_mime: DEFAULT_VISION_IMAGE_MIME.to_string(),
            timeout_secs: 120,
            max_retries: 1,
            retry_delay_ms: 500,
        }
    }
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("vision_model", &self.vision_model)
            .field("text_model", &self.text_model)
            .field("vision_image_mime", &self.vision_image_mime)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

/// Upload bounds and scratch storage
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub scratch_dir: PathBuf,
    /// Age after which persisted images are deleted; 0 keeps them forever
    pub scratch_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            scratch_ttl_secs: DEFAULT_SCRATCH_TTL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct StorytellerConfig {
    pub inference: InferenceConfig,
    pub image: ImageConfig,
    pub server: ServerConfig,
}

impl StorytellerConfig {
    /// Defaults for everything except the credential
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            inference: InferenceConfig::with_api_key(api_key),
            image: ImageConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::with_api_key(api_key);

        let inference = &mut config.inference;
        if let Some(v) = lookup("INFERENCE_BASE_URL") {
            inference.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("VISION_MODEL") {
            inference.vision_model = v;
        }
        if let Some(v) = lookup("TEXT_MODEL") {
            inference.text_model = v;
        }
        if let Some(v) = lookup("VISION_IMAGE_MIME") {
            inference.vision_image_mime = v;
        }
        inference.timeout_secs = parse_or(&lookup, "INFERENCE_TIMEOUT_SECS", inference.timeout_secs)?;
        inference.max_retries = parse_or(&lookup, "INFERENCE_MAX_RETRIES", inference.max_retries)?;
        inference.retry_delay_ms = parse_or(&lookup, "INFERENCE_RETRY_DELAY_MS", inference.retry_delay_ms)?;

        let image = &mut config.image;
        image.max_width = parse_or(&lookup, "MAX_IMAGE_WIDTH", image.max_width)?;
        image.max_height = parse_or(&lookup, "MAX_IMAGE_HEIGHT", image.max_height)?;
        image.max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", image.max_upload_bytes)?;
        if let Some(v) = lookup("SCRATCH_DIR") {
            image.scratch_dir = PathBuf::from(v);
        }
        image.scratch_ttl_secs = parse_or(&lookup, "SCRATCH_TTL_SECS", image.scratch_ttl_secs)?;

        if let Some(v) = lookup("API_HOST") {
            config.server.host = v;
        }
        config.server.port = parse_or(&lookup, "API_PORT", config.server.port)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let url = url::Url::parse(&self.inference.base_url).map_err(|_| ConfigError::InvalidValue {
            var: "INFERENCE_BASE_URL".to_string(),
            value: self.inference.base_url.clone(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "inference base URL must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if self.inference.vision_model.is_empty() || self.inference.text_model.is_empty() {
            return Err(ConfigError::Invalid("model identifiers must not be empty".to_string()));
        }
        if !self.inference.vision_image_mime.starts_with("image/") {
            return Err(ConfigError::InvalidValue {
                var: "VISION_IMAGE_MIME".to_string(),
                value: self.inference.vision_image_mime.clone(),
            });
        }
        if self.inference.timeout_secs == 0 {
            return Err(ConfigError::Invalid("inference timeout must be greater than 0".to_string()));
        }
        if self.image.max_width == 0 || self.image.max_height == 0 {
            return Err(ConfigError::Invalid("image bounds must be greater than 0".to_string()));
        }
        if self.image.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("upload limit must be greater than 0".to_string()));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
