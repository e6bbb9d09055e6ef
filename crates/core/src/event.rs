// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the engine
//!
//! Every observable change flows through this enum: the bus fans events out
//! to live subscribers and the event log keeps the durable audit trail.

use crate::record::ExecutionRecord;
use crate::studio::{MachineType, StudioId, StudioState};
use crate::trigger::{TriggerAction, TriggerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by state machines and the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Studio events
    StudioStateChanged {
        studio: StudioId,
        from: StudioState,
        to: StudioState,
        observed_at: DateTime<Utc>,
    },
    StudioDegraded {
        studio: StudioId,
        reason: String,
        failures: u32,
    },

    // Transition events
    TransitionRequested {
        studio: StudioId,
        action: TriggerAction,
        machine_type: Option<MachineType>,
    },
    TransitionCompleted {
        studio: StudioId,
        action: TriggerAction,
    },
    TransitionTimedOut {
        studio: StudioId,
        action: TriggerAction,
    },
    TransitionCancelled {
        studio: StudioId,
        action: TriggerAction,
    },

    // Trigger lifecycle events
    TriggerCreated {
        id: TriggerId,
        name: String,
        studio: StudioId,
    },
    TriggerUpdated {
        id: TriggerId,
    },
    TriggerDeleted {
        id: TriggerId,
    },
    TriggerEnabled {
        id: TriggerId,
    },
    TriggerDisabled {
        id: TriggerId,
    },
    TriggerFired {
        id: TriggerId,
        studio: StudioId,
        action: TriggerAction,
        at: DateTime<Utc>,
    },
    TriggerSpent {
        id: TriggerId,
    },
    /// A fire deferred by downtime, executed once on restart
    TriggerCaughtUp {
        id: TriggerId,
        scheduled_for: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    },

    // Execution events
    ExecutionRecorded {
        record: ExecutionRecord,
    },
}

impl Event {
    /// Get the event name for pattern matching
    /// Format: "category:action"
    pub fn name(&self) -> &'static str {
        match self {
            Event::StudioStateChanged { .. } => "studio:state",
            Event::StudioDegraded { .. } => "studio:degraded",

            Event::TransitionRequested { .. } => "transition:requested",
            Event::TransitionCompleted { .. } => "transition:completed",
            Event::TransitionTimedOut { .. } => "transition:timeout",
            Event::TransitionCancelled { .. } => "transition:cancelled",

            Event::TriggerCreated { .. } => "trigger:created",
            Event::TriggerUpdated { .. } => "trigger:updated",
            Event::TriggerDeleted { .. } => "trigger:deleted",
            Event::TriggerEnabled { .. } => "trigger:enabled",
            Event::TriggerDisabled { .. } => "trigger:disabled",
            Event::TriggerFired { .. } => "trigger:fired",
            Event::TriggerSpent { .. } => "trigger:spent",
            Event::TriggerCaughtUp { .. } => "trigger:caughtup",

            Event::ExecutionRecorded { .. } => "execution:recorded",
        }
    }
}
