// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod story;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Vision Storyteller CLI
#[derive(Parser, Debug)]
#[command(name = "storyteller-cli")]
#[command(version)]
#[command(about = "Describe an image and write a short story about it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline on a local image file
    Story(story::StoryArgs),

    /// Print the effective configuration (credential redacted)
    ShowConfig(story::OverrideArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Story(args) => story::run_story(args).await,
        Commands::ShowConfig(args) => story::show_config(args),
    }
}
