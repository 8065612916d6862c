// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};
use uuid::Uuid;

use crate::inference::InferenceError;
use crate::pipeline::{PipelineError, Stage};
use crate::vision::ImageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    /// `size` is unknown when the body limit cut the upload off mid-stream
    PayloadTooLarge { size: Option<usize>, max: usize },
    Upstream { stage: Stage, message: String },
    InternalError(String),
    Timeout,
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::PayloadTooLarge { size, max } => {
                let mut details = HashMap::new();
                details.insert("max".to_string(), serde_json::Value::Number((*max).into()));
                let message = match size {
                    Some(size) => {
                        details.insert("size".to_string(), serde_json::Value::Number((*size).into()));
                        format!("Upload of {} bytes exceeds the {} byte limit", size, max)
                    }
                    None => format!("Upload exceeds the {} byte limit", max),
                };
                ("payload_too_large", message, Some(details))
            }
            ApiError::Upstream { stage, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "stage".to_string(),
                    serde_json::Value::String(stage.to_string()),
                );
                ("upstream_error", message.clone(), Some(details))
            }
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
            ApiError::Timeout => ("timeout", "Request timed out".to_string(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::Upstream { .. } => 502,
            ApiError::InternalError(_) => 500,
            ApiError::Timeout => 504,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::PayloadTooLarge {
                size: Some(size),
                max,
            } => write!(f, "Payload too large: {} bytes (max {})", size, max),
            ApiError::PayloadTooLarge { size: None, max } => {
                write!(f, "Payload too large (max {})", max)
            }
            ApiError::Upstream { stage, message } => {
                write!(f, "Upstream error during {}: {}", stage, message)
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Decode(ImageError::TooLarge(size, max)) => {
                ApiError::PayloadTooLarge {
                    size: Some(size),
                    max,
                }
            }
            PipelineError::Decode(e) => ApiError::ValidationError {
                field: "image".to_string(),
                message: e.to_string(),
            },
            PipelineError::Inference {
                source: InferenceError::Timeout { .. },
                ..
            } => ApiError::Timeout,
            PipelineError::Inference { stage, source } => ApiError::Upstream {
                stage,
                message: source.to_string(),
            },
            // Scratch paths stay out of client-facing messages
            PipelineError::Io { path, source } => {
                error!("Scratch I/O failure on {}: {}", path.display(), source);
                ApiError::InternalError("failed to store the uploaded image".to_string())
            }
            PipelineError::Task(msg) => {
                error!("Preprocessing task failure: {}", msg);
                ApiError::InternalError("image preprocessing failed".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Same id in the body and the log line
        let request_id = Uuid::new_v4().to_string();
        warn!(request_id = %request_id, status = status.as_u16(), "Request failed: {}", self);
        (status, Json(self.to_response(Some(request_id)))).into_response()
    }
}
