// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use crate::client::{self, DaemonClient};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the daemon if it is not running
    Start,
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
    /// Print the daemon log path
    Logs,
}

pub async fn run(args: DaemonArgs, repo: Option<PathBuf>) -> Result<()> {
    let project_root = match repo {
        Some(root) => root,
        None => client::find_project_root()?,
    };

    match args.command {
        DaemonCommand::Start => {
            let daemon = DaemonClient::connect_or_start(project_root).await?;
            let version = daemon.hello().await?;
            println!("Daemon running (version {})", version);
        }

        DaemonCommand::Stop => {
            if client::daemon_stop(&project_root).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon was not running");
            }
        }

        DaemonCommand::Status => match DaemonClient::connect(project_root) {
            Ok(daemon) => {
                let (uptime_secs, studios, triggers_active) = daemon.status().await?;
                println!(
                    "Daemon up {} ({} studios, {} active triggers)",
                    humantime::format_duration(std::time::Duration::from_secs(uptime_secs)),
                    studios,
                    triggers_active,
                );
            }
            Err(client::ClientError::DaemonNotRunning) => {
                println!("Daemon not running");
            }
            Err(e) => return Err(e.into()),
        },

        DaemonCommand::Logs => {
            let daemon_dir = client::get_daemon_dir(&project_root)?;
            println!("{}", daemon_dir.join("daemon.log").display());
        }
    }

    Ok(())
}
