// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::StorytellerConfig;
use crate::inference::GroqClient;
use crate::pipeline::{Pipeline, UploadedImage};

/// Overrides applied on top of the environment configuration
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Vision model identifier
    #[arg(long)]
    pub vision_model: Option<String>,

    /// Text model identifier
    #[arg(long)]
    pub text_model: Option<String>,

    /// Maximum width of the resized image
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Maximum height of the resized image
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Directory for resized copies
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

impl OverrideArgs {
    pub fn apply(&self, config: &mut StorytellerConfig) {
        if let Some(ref model) = self.vision_model {
            config.inference.vision_model = model.clone();
        }
        if let Some(ref model) = self.text_model {
            config.inference.text_model = model.clone();
        }
        if let Some(width) = self.max_width {
            config.image.max_width = width;
        }
        if let Some(height) = self.max_height {
            config.image.max_height = height;
        }
        if let Some(ref dir) = self.scratch_dir {
            config.image.scratch_dir = dir.clone();
        }
    }
}

/// Arguments for the story command
#[derive(Args, Debug)]
pub struct StoryArgs {
    /// Image file to describe
    pub image: PathBuf,

    /// Custom instruction for the vision model
    #[arg(long)]
    pub prompt: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

fn load_config(overrides: &OverrideArgs) -> Result<StorytellerConfig> {
    dotenv::dotenv().ok();

    let mut config = StorytellerConfig::from_env()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

pub async fn run_story(args: StoryArgs) -> Result<()> {
    let config = load_config(&args.overrides)?;

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("failed to read {}", args.image.display()))?;
    let filename = args
        .image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let client = Arc::new(GroqClient::new(&config.inference)?);
    let mut pipeline = Pipeline::new(&config, client);
    if let Some(prompt) = args.prompt {
        pipeline = pipeline.with_prompt(prompt);
    }

    info!("Running pipeline on {}", args.image.display());
    let output = pipeline.run(UploadedImage::new(bytes, filename)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Resized image: {} ({}x{})\n",
            output.image.path.display(),
            output.image.width,
            output.image.height
        );
        println!("### Image Description\n{}\n", output.description);
        println!("### Generated Story\n{}", output.story);
    }

    Ok(())
}

pub fn show_config(args: OverrideArgs) -> Result<()> {
    let config = load_config(&args)?;
    println!("{:#?}", config);
    Ok(())
}
