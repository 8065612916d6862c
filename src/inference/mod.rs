// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote inference: chat-completion client, image description, story generation

pub mod client;
pub mod describer;
pub mod story;
pub mod types;

pub use client::{ChatCompletion, GroqClient};
pub use describer::{DescribeResult, VisionDescriber, DESCRIBE_PROMPT};
pub use story::{StoryGenerator, StoryResult, STORY_SYSTEM_PROMPT};
pub use types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChatResponseMessage, ChatUsage,
    ContentPart, ImageUrl, InferenceError, MessageContent, Role,
};
