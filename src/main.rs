// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use std::{env, net::SocketAddr, sync::Arc};
use vision_storyteller::{
    api::{start_server, AppState},
    config::StorytellerConfig,
    inference::GroqClient,
    pipeline::Pipeline,
    version,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting {}", version::get_version_string());

    // A missing credential is fatal here, never per request
    let config = StorytellerConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        "Models: vision={}, text={}; scratch dir {}",
        config.inference.vision_model,
        config.inference.text_model,
        config.image.scratch_dir.display()
    );

    let client = Arc::new(GroqClient::new(&config.inference)?);
    let pipeline = Pipeline::new(&config, client);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address()))?;

    start_server(AppState::new(pipeline), addr).await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}
