// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sk - Studio Keeper CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod completions;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, events, studio, trigger};
use std::path::PathBuf;

use crate::client::{find_project_root, DaemonClient};

#[derive(Parser)]
#[command(
    name = "sk",
    version,
    about = "Studio Keeper - scheduled lifecycle control for remote studios"
)]
struct Cli {
    /// Project root directory (where sk.toml lives)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger management
    Trigger(trigger::TriggerArgs),
    /// Studio state and manual transitions
    Studio(studio::StudioArgs),
    /// Query the event log
    Events(events::EventsArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr, gated by RUST_LOG; normal output is plain stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions(args) => {
            completions::generate_completions::<Cli>(args.shell);
            Ok(())
        }

        // Daemon management does its own connection handling
        Commands::Daemon(args) => daemon::run(args, cli.repo).await,

        // Everything else goes through a connected daemon
        command => {
            let project_root = cli.repo.map_or_else(find_project_root, Ok)?;
            let client = DaemonClient::connect_or_start(project_root).await?;

            match command {
                Commands::Trigger(args) => trigger::run(&client, args).await,
                Commands::Studio(args) => studio::run(&client, args).await,
                Commands::Events(args) => events::run(&client, args).await,
                Commands::Daemon(_) | Commands::Completions(_) => Ok(()),
            }
        }
    }
}
