// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use sk_core::EventRecord;
use sk_daemon::protocol::{StudioSummary, TriggerSummary};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}

fn trigger_line(t: &TriggerSummary) -> String {
    format!(
        "{}  {}  {} {} ({})  {}  next: {}",
        t.id,
        t.name,
        t.action,
        t.studio,
        t.recurrence,
        if t.enabled {
            t.status.clone()
        } else {
            "disabled".to_string()
        },
        fmt_time(t.next_fire_at),
    )
}

/// Print one trigger
pub fn print_trigger(trigger: &TriggerSummary, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", trigger_line(trigger));
            println!("  last fired: {}", fmt_time(trigger.last_fired_at));
            println!("  machine:    {}", trigger.machine_type);
        }
        OutputFormat::Json => print_json(trigger),
    }
}

/// Print a trigger list
pub fn print_triggers(triggers: &[TriggerSummary], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if triggers.is_empty() {
                println!("no triggers");
                return;
            }
            for trigger in triggers {
                println!("{}", trigger_line(trigger));
            }
        }
        OutputFormat::Json => print_json(&triggers),
    }
}

/// Print a studio list
pub fn print_studios(studios: &[StudioSummary], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            if studios.is_empty() {
                println!("no studios configured");
                return;
            }
            for studio in studios {
                println!(
                    "{}  {}  observed: {}  machine: {}",
                    studio.id,
                    studio.state,
                    fmt_time(studio.observed_at),
                    studio.machine_type,
                );
            }
        }
        OutputFormat::Json => print_json(&studios),
    }
}

/// Print an event list
pub fn print_events(events: &[EventRecord], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for event in events {
                println!(
                    "{:>6}  {}  {}",
                    event.sequence,
                    event.at.format("%Y-%m-%d %H:%M:%S"),
                    event.name,
                );
            }
        }
        OutputFormat::Json => print_json(&events),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}
