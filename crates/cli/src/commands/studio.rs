// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Studio state and manual transition commands

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use sk_core::{MachineType, TriggerAction};

#[derive(Args, Debug)]
pub struct StudioArgs {
    #[command(subcommand)]
    pub command: StudioCommand,
}

#[derive(Subcommand, Debug)]
pub enum StudioCommand {
    /// List all studios with their cached state
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one studio's cached state
    Status {
        /// Studio as owner/teamspace/name
        studio: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Request a start; returns immediately with the pending state
    Start {
        studio: String,
        /// Machine type override
        #[arg(long)]
        machine: Option<String>,
    },
    /// Request a stop; returns immediately with the pending state
    Stop { studio: String },
    /// Stop waiting for an in-flight transition (the remote call stands)
    Cancel { studio: String },
}

pub async fn run(client: &DaemonClient, args: StudioArgs) -> Result<()> {
    match args.command {
        StudioCommand::List { format } => {
            let studios = client.list_studios().await?;
            output::print_studios(&studios, format);
        }

        StudioCommand::Status { studio, format } => match client.get_studio(&studio).await? {
            Some(summary) => output::print_studios(std::slice::from_ref(&summary), format),
            None => println!("studio not found: {}", studio),
        },

        StudioCommand::Start { studio, machine } => {
            let machine_type = machine
                .map(|m| m.parse::<MachineType>().map_err(|e| anyhow!(e)))
                .transpose()?;
            let state = client
                .transition(&studio, TriggerAction::Start, machine_type)
                .await?;
            println!("Start requested for {} (state: {})", studio, state);
        }

        StudioCommand::Stop { studio } => {
            let state = client.transition(&studio, TriggerAction::Stop, None).await?;
            println!("Stop requested for {} (state: {})", studio, state);
        }

        StudioCommand::Cancel { studio } => {
            if client.transition_cancel(&studio).await? {
                println!("Cancelled in-flight transition for {}", studio);
            } else {
                println!("No in-flight transition for {}", studio);
            }
        }
    }

    Ok(())
}
