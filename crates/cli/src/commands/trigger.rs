// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger management commands

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveTime, Utc};
use clap::{Args, Subcommand};
use sk_core::recurrence::parse_weekday;
use sk_core::{HookSpec, MachineType, Recurrence, StudioId, TriggerAction, TriggerConfig};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct TriggerArgs {
    #[command(subcommand)]
    pub command: TriggerCommand,
}

#[derive(Subcommand, Debug)]
pub enum TriggerCommand {
    /// Create a trigger
    Add(AddArgs),
    /// List triggers
    List {
        /// Only enabled triggers
        #[arg(long)]
        enabled: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one trigger
    Show {
        id: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete a trigger
    Rm { id: String },
    /// Enable a trigger
    Enable { id: String },
    /// Disable a trigger
    Disable { id: String },
    /// Replace a trigger's schedule
    Reschedule {
        id: String,
        #[command(flatten)]
        when: WhenArgs,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Target studio as owner/teamspace/name
    #[arg(long)]
    pub studio: String,
    /// Lifecycle action to perform
    #[arg(long)]
    pub action: String,
    #[command(flatten)]
    pub when: WhenArgs,
    /// Machine type for start actions
    #[arg(long)]
    pub machine: Option<String>,
    /// Command to run after a start action reaches running
    #[arg(long)]
    pub post_start_cmd: Option<String>,
    /// Timeout for the post-start command (e.g. "5m")
    #[arg(long, default_value = "5m")]
    pub post_start_timeout: String,
    /// Command to run before a stop action
    #[arg(long)]
    pub pre_stop_cmd: Option<String>,
    /// Timeout for the pre-stop command (e.g. "5m")
    #[arg(long, default_value = "5m")]
    pub pre_stop_timeout: String,
    /// Create the trigger disabled
    #[arg(long)]
    pub disabled: bool,
}

/// Schedule arguments: exactly one of --once / --daily / --weekly
#[derive(Args, Debug)]
pub struct WhenArgs {
    /// Fire once at an RFC3339 instant (e.g. "2026-08-10T09:00:00Z")
    #[arg(long)]
    pub once: Option<String>,
    /// Fire every day at HH:MM UTC
    #[arg(long)]
    pub daily: Option<String>,
    /// Fire weekly at HH:MM UTC on --days
    #[arg(long)]
    pub weekly: Option<String>,
    /// Weekdays for --weekly, comma separated (e.g. "mon,fri")
    #[arg(long)]
    pub days: Option<String>,
}

impl WhenArgs {
    pub fn to_recurrence(&self) -> Result<Recurrence> {
        match (&self.once, &self.daily, &self.weekly) {
            (Some(at), None, None) => {
                let at: DateTime<Utc> = at
                    .parse()
                    .map_err(|e| anyhow!("invalid --once instant: {}", e))?;
                Ok(Recurrence::Once { at })
            }
            (None, Some(time), None) => Ok(Recurrence::Daily {
                at: parse_time_of_day(time)?,
            }),
            (None, None, Some(time)) => {
                let days_spec = self
                    .days
                    .as_deref()
                    .ok_or_else(|| anyhow!("--weekly requires --days"))?;
                let days = days_spec
                    .split(',')
                    .map(|d| parse_weekday(d.trim()).map_err(|e| anyhow!(e)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Recurrence::Weekly {
                    at: parse_time_of_day(time)?,
                    days,
                })
            }
            _ => bail!("specify exactly one of --once, --daily, --weekly"),
        }
    }
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow!("invalid time of day (expected HH:MM): {}", s))
}

fn parse_hook(cmd: &Option<String>, timeout: &str) -> Result<Option<HookSpec>> {
    let Some(cmd) = cmd else {
        return Ok(None);
    };
    let timeout: Duration =
        humantime::parse_duration(timeout).map_err(|e| anyhow!("invalid hook timeout: {}", e))?;
    Ok(Some(HookSpec::new(cmd.clone(), timeout)))
}

pub async fn run(client: &DaemonClient, args: TriggerArgs) -> Result<()> {
    match args.command {
        TriggerCommand::Add(add) => {
            let studio: StudioId = add.studio.parse().map_err(|e: String| anyhow!(e))?;
            let action: TriggerAction = add.action.parse().map_err(|e: String| anyhow!(e))?;

            let mut config =
                TriggerConfig::new(add.name.clone(), studio, action, add.when.to_recurrence()?);
            if let Some(machine) = &add.machine {
                config = config
                    .with_machine_type(machine.parse::<MachineType>().map_err(|e| anyhow!(e))?);
            }
            config.post_start_hook = parse_hook(&add.post_start_cmd, &add.post_start_timeout)?;
            config.pre_stop_hook = parse_hook(&add.pre_stop_cmd, &add.pre_stop_timeout)?;
            if add.disabled {
                config = config.disabled();
            }

            let trigger = client.trigger_create(config).await?;
            println!("Created trigger {} ({})", trigger.id, trigger.name);
        }

        TriggerCommand::List { enabled, format } => {
            let triggers = client.list_triggers(enabled).await?;
            output::print_triggers(&triggers, format);
        }

        TriggerCommand::Show { id, format } => {
            let trigger = client.get_trigger(&id).await?;
            output::print_trigger(&trigger, format);
        }

        TriggerCommand::Rm { id } => {
            client.trigger_delete(&id).await?;
            println!("Deleted trigger {}", id);
        }

        TriggerCommand::Enable { id } => {
            let trigger = client.trigger_enable(&id, true).await?;
            println!(
                "Enabled trigger {} (next fire: {})",
                trigger.id,
                trigger
                    .next_fire_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string())
            );
        }

        TriggerCommand::Disable { id } => {
            let trigger = client.trigger_enable(&id, false).await?;
            println!("Disabled trigger {}", trigger.id);
        }

        TriggerCommand::Reschedule { id, when } => {
            let trigger = client.trigger_reschedule(&id, when.to_recurrence()?).await?;
            println!(
                "Rescheduled trigger {} (next fire: {})",
                trigger.id,
                trigger
                    .next_fire_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    Ok(())
}
