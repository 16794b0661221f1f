// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # formcheck
//!
//! Command-line interface for the formcheck-rt pipeline.
//!
//! ## Usage
//! ```bash
//! # Simulated 10 s capture session at 30 fps
//! formcheck run --frames 300 --fps 30
//!
//! # Hot-swap to the noisy model after 150 frames
//! formcheck run --swap-to synthetic-squat-noisy --swap-at 150
//!
//! # Show the resolved configuration
//! formcheck --config formcheck.toml inspect
//!
//! # List estimator ids
//! formcheck models
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "formcheck",
    about = "Real-time exercise-form analysis from pose keypoints",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated capture session through the pipeline.
    Run {
        /// Estimator id to start with (overrides the config).
        #[arg(short, long)]
        model: Option<String>,

        /// Number of frames the simulated camera produces.
        #[arg(short = 'n', long, default_value_t = 300)]
        frames: u64,

        /// Capture frame rate.
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Estimator id to switch to mid-session.
        #[arg(long)]
        swap_to: Option<String>,

        /// Frame index at which the switch is requested.
        #[arg(long, requires = "swap_to")]
        swap_at: Option<u64>,

        /// Print the final snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved configuration and exercise profile.
    Inspect,

    /// List the estimator ids the configuration can select.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            model,
            frames,
            fps,
            swap_to,
            swap_at,
            json,
        } => {
            let options = commands::run::RunOptions {
                model,
                frames,
                fps,
                swap: swap_to.map(|id| (id, swap_at.unwrap_or(frames / 2))),
                json,
            };
            commands::run::execute(config, options).await
        }
        Commands::Inspect => commands::inspect::execute(&config),
        Commands::Models => commands::models::execute(&config),
    }
}
