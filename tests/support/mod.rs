// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures: generated images and a scripted chat-completion double
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use vision_storyteller::config::StorytellerConfig;
use vision_storyteller::inference::{
    ChatChoice, ChatCompletion, ChatRequest, ChatResponse, ChatResponseMessage, InferenceError,
};

/// Gradient image so encoders have something non-trivial to compress
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

pub fn test_config(scratch_dir: &Path) -> StorytellerConfig {
    let mut config = StorytellerConfig::with_api_key("test-key");
    config.inference.vision_model = "vision-test".to_string();
    config.inference.text_model = "text-test".to_string();
    config.image.scratch_dir = scratch_dir.to_path_buf();
    config
}

pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![ChatChoice {
            message: ChatResponseMessage {
                content: Some(text.to_string()),
            },
        }],
        usage: None,
    }
}

pub fn empty_response() -> ChatResponse {
    ChatResponse {
        choices: vec![],
        usage: None,
    }
}

/// Answers requests from a fixed script and records what it was asked
pub struct ScriptedChat {
    script: Mutex<VecDeque<Result<ChatResponse, InferenceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(script: Vec<Result<ChatResponse, InferenceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Vision call answers `description`, story call answers `story`
    pub fn describing(description: &str, story: &str) -> Self {
        Self::new(vec![Ok(text_response(description)), Ok(text_response(story))])
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedChat ran out of responses"))
    }
}

/// Answers every request with a response derived from the request itself
pub struct EchoChat;

#[async_trait]
impl ChatCompletion for EchoChat {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        Ok(text_response(&format!("reply from {}", request.model)))
    }
}
