// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::errors::ApiError;
use super::story::story_handler;
use super::ui::INDEX_HTML;
use crate::pipeline::Pipeline;
use crate::version;
use crate::vision::extension_to_mime;

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub vision_model: String,
    pub text_model: String,
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.pipeline.image_config().max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        // Upload page
        .route("/", get(index_handler))
        // Health check
        .route("/health", get(health_handler))
        // Pipeline endpoint
        .route("/v1/story", post(story_handler))
        // Resized uploads
        .route("/v1/images/:name", get(image_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION.to_string(),
        vision_model: state.pipeline.vision_model().to_string(),
        text_model: state.pipeline.text_model().to_string(),
    })
}

/// GET /v1/images/:name - Serve a persisted scratch image
async fn image_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_scratch_name(&name) {
        return Err(ApiError::InvalidRequest(format!("invalid image name '{}'", name)));
    }

    let mime = name
        .rsplit_once('.')
        .and_then(|(_, ext)| extension_to_mime(ext))
        .ok_or_else(|| ApiError::NotFound(name.clone()))?;

    let path = state.pipeline.image_config().scratch_dir.join(&name);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(name.clone())
        } else {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            ApiError::InternalError("failed to read image".to_string())
        }
    })?;

    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}

/// Scratch names are flat: no separators, no leading dot
fn is_scratch_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}
