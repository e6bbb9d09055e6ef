// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log queries

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Only events after this sequence number
    #[arg(long, default_value_t = 0)]
    pub since: u64,
    /// Filter by name pattern (e.g. "trigger:*", "execution:recorded")
    #[arg(long)]
    pub pattern: Option<String>,
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(client: &DaemonClient, args: EventsArgs) -> Result<()> {
    let events = match &args.pattern {
        Some(pattern) => client.events_matching(pattern).await?,
        None => client.events_since(args.since).await?,
    };
    output::print_events(&events, args.format);
    Ok(())
}
