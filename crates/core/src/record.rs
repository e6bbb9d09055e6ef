// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution records: the durable outcome of one trigger firing

use crate::studio::StudioId;
use crate::trigger::{TriggerAction, TriggerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall outcome of one trigger execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Transition reached its terminal state and every configured hook exited zero
    Success,
    /// Transition succeeded but a hook failed or timed out
    PartialFailure,
    /// The transition itself failed or timed out
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::PartialFailure => write!(f, "partial-failure"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// Captured result of one hook command run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookOutcome {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// None when the process was killed before exiting (timeout)
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HookOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Classify an execution from its transition result and optional hook
pub fn classify_outcome(transition_ok: bool, hook: Option<&HookOutcome>) -> Outcome {
    if !transition_ok {
        return Outcome::Failure;
    }
    match hook {
        Some(h) if !h.succeeded() => Outcome::PartialFailure,
        _ => Outcome::Success,
    }
}

/// The durable record of one trigger firing
///
/// Append-only: produced by the action runner, written to the event log,
/// never mutated or deleted by the core. The trigger it references may have
/// been deleted by the time the record is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub trigger_id: TriggerId,
    pub trigger_name: String,
    pub studio: StudioId,
    pub action: TriggerAction,
    pub fired_at: DateTime<Utc>,
    #[serde(default)]
    pub hook: Option<HookOutcome>,
    pub outcome: Outcome,
    /// Transition error, when the outcome is `Failure`
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
