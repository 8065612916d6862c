// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Story endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::{multipart::MultipartError, Multipart};
use tracing::{debug, info};

use super::response::StoryResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline::UploadedImage;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// POST /v1/story - Describe an uploaded image and write a story about it
///
/// # Request
/// `multipart/form-data` with an `image` file field (PNG or JPEG; other
/// formats the decoder recognises are accepted too).
///
/// # Response
/// - `description`: Text from the vision model
/// - `story`: Text from the story model
/// - `image`: Resized dimensions and the URL of the persisted copy
/// - `visionModel`, `textModel`, `timings`, `tokensUsed`
///
/// # Errors
/// - 400 Bad Request: missing or undecodable image
/// - 413 Payload Too Large: upload exceeds the configured bound (decoded size
///   or the request body limit)
/// - 502 Bad Gateway: the inference endpoint failed or returned nothing
/// - 504 Gateway Timeout: the inference endpoint timed out
pub async fn story_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StoryResponse>, ApiError> {
    let max_upload_bytes = state.pipeline.image_config().max_upload_bytes;
    let upload = read_upload(multipart, max_upload_bytes).await?;
    info!(
        "Story request received: {} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let output = state.pipeline.run(upload).await.map_err(ApiError::from)?;

    Ok(Json(StoryResponse::from(output)))
}

async fn read_upload(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<UploadedImage, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_bytes, "malformed multipart body"))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_upload_bytes, "failed to read upload"))?;

        if bytes.is_empty() {
            return Err(ApiError::ValidationError {
                field: IMAGE_FIELD.to_string(),
                message: "image is empty".to_string(),
            });
        }

        let mut upload = UploadedImage::new(bytes.to_vec(), filename);
        if let Some(content_type) = content_type {
            upload = upload.with_content_type(content_type);
        }
        return Ok(upload);
    }

    Err(ApiError::ValidationError {
        field: IMAGE_FIELD.to_string(),
        message: "image is required".to_string(),
    })
}

/// The body limit surfaces as a multipart error; keep its 413
fn multipart_error(err: MultipartError, max_upload_bytes: usize, context: &str) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            size: None,
            max: max_upload_bytes,
        }
    } else {
        ApiError::InvalidRequest(format!("{}: {}", context, err))
    }
}
