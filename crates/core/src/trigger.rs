// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger state machine for scheduled studio actions
//!
//! A Trigger is a persisted rule: at instants described by its recurrence,
//! perform a lifecycle action on one studio, with optional command hooks
//! around it. Transitions are pure and return effects; the evaluator applies
//! them and the store makes them durable.

use crate::clock::Clock;
use crate::effect::Effect;
use crate::event::Event;
use crate::recurrence::Recurrence;
use crate::studio::{MachineType, StudioId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a trigger (stable and immutable)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(pub String);

impl TriggerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TriggerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TriggerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The lifecycle action a trigger performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    Start,
    Stop,
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerAction::Start => write!(f, "start"),
            TriggerAction::Stop => write!(f, "stop"),
        }
    }
}

impl FromStr for TriggerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TriggerAction::Start),
            "stop" => Ok(TriggerAction::Stop),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

/// A user-supplied hook command with its execution timeout
///
/// The command string is opaque; it runs through the configured execution
/// profile (interpreter + args), never through runtime interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSpec {
    pub command: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl HookSpec {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

/// Whether a trigger can still fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    /// Will fire when due
    Active,
    /// A consumed `Once` trigger; kept for the audit trail, never fires again
    Spent,
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStatus::Active => write!(f, "active"),
            TriggerStatus::Spent => write!(f, "spent"),
        }
    }
}

/// Validation failures for trigger configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("trigger name must not be empty")]
    EmptyName,
    #[error("weekly recurrence needs at least one weekday")]
    NoWeekdays,
    #[error("once recurrence is already in the past: {0}")]
    OnceInPast(DateTime<Utc>),
    #[error("hook command must not be empty")]
    EmptyHookCommand,
    #[error("hook timeout must be greater than zero")]
    ZeroHookTimeout,
}

/// Configuration for creating a trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    pub studio: StudioId,
    pub action: TriggerAction,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub machine_type: MachineType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub post_start_hook: Option<HookSpec>,
    #[serde(default)]
    pub pre_stop_hook: Option<HookSpec>,
}

fn default_enabled() -> bool {
    true
}

impl TriggerConfig {
    pub fn new(
        name: impl Into<String>,
        studio: StudioId,
        action: TriggerAction,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            name: name.into(),
            studio,
            action,
            recurrence,
            machine_type: MachineType::default(),
            enabled: true,
            post_start_hook: None,
            pre_stop_hook: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_machine_type(mut self, machine_type: MachineType) -> Self {
        self.machine_type = machine_type;
        self
    }

    pub fn with_post_start_hook(mut self, hook: HookSpec) -> Self {
        self.post_start_hook = Some(hook);
        self
    }

    pub fn with_pre_stop_hook(mut self, hook: HookSpec) -> Self {
        self.pre_stop_hook = Some(hook);
        self
    }

    /// Validate the configuration against `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        match &self.recurrence {
            Recurrence::Weekly { days, .. } if days.is_empty() => {
                return Err(ValidationError::NoWeekdays)
            }
            Recurrence::Once { at } if *at <= now => {
                return Err(ValidationError::OnceInPast(*at))
            }
            _ => {}
        }
        for hook in [&self.post_start_hook, &self.pre_stop_hook].into_iter().flatten() {
            if hook.command.trim().is_empty() {
                return Err(ValidationError::EmptyHookCommand);
            }
            if hook.timeout.is_zero() {
                return Err(ValidationError::ZeroHookTimeout);
            }
        }
        Ok(())
    }
}

/// A persisted rule describing when and what lifecycle action to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub name: String,
    pub studio: StudioId,
    pub action: TriggerAction,
    pub recurrence: Recurrence,
    pub machine_type: MachineType,
    pub enabled: bool,
    pub status: TriggerStatus,
    #[serde(default)]
    pub post_start_hook: Option<HookSpec>,
    #[serde(default)]
    pub pre_stop_hook: Option<HookSpec>,
    pub created_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Next due instant; `None` only for a spent `Once` trigger
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every durable write
    #[serde(default)]
    pub version: u64,
}

impl Trigger {
    /// Create a new trigger, computing its first fire instant
    pub fn new(id: TriggerId, config: TriggerConfig, clock: &impl Clock) -> Self {
        let now = clock.now();
        let next_fire_at = config.recurrence.next_occurrence(now);
        Self {
            id,
            name: config.name,
            studio: config.studio,
            action: config.action,
            recurrence: config.recurrence,
            machine_type: config.machine_type,
            enabled: config.enabled,
            status: TriggerStatus::Active,
            post_start_hook: config.post_start_hook,
            pre_stop_hook: config.pre_stop_hook,
            created_at: now,
            last_fired_at: None,
            next_fire_at,
            version: 0,
        }
    }

    /// Whether this trigger is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.status == TriggerStatus::Active
            && self.next_fire_at.is_some_and(|at| at <= now)
    }

    /// Consume one fire instant.
    ///
    /// Records the fire time and recomputes `next_fire_at` strictly after
    /// it, so a trigger fires at most once per due instant regardless of
    /// how many ticks observe it. A `Once` trigger becomes `Spent` instead
    /// of being deleted.
    pub fn fire(&self, clock: &impl Clock) -> (Self, Vec<Effect>) {
        if self.status == TriggerStatus::Spent {
            return (self.clone(), vec![]);
        }

        let now = clock.now();
        let next_fire_at = self.recurrence.next_occurrence(now);
        let status = if matches!(self.recurrence, Recurrence::Once { .. }) {
            TriggerStatus::Spent
        } else {
            TriggerStatus::Active
        };

        let new_state = Trigger {
            status,
            last_fired_at: Some(now),
            next_fire_at: match status {
                TriggerStatus::Spent => None,
                TriggerStatus::Active => next_fire_at,
            },
            ..self.clone()
        };

        let mut effects = vec![Effect::Emit(Event::TriggerFired {
            id: self.id.clone(),
            studio: self.studio.clone(),
            action: self.action,
            at: now,
        })];
        if new_state.status == TriggerStatus::Spent {
            effects.push(Effect::Emit(Event::TriggerSpent {
                id: self.id.clone(),
            }));
        }
        effects.push(Effect::SaveTrigger {
            id: self.id.clone(),
        });

        (new_state, effects)
    }

    /// Enable or disable the trigger.
    ///
    /// Enabling recomputes `next_fire_at` forward so a long-disabled
    /// trigger does not fire immediately for instants that passed while it
    /// was off.
    pub fn set_enabled(&self, enabled: bool, clock: &impl Clock) -> (Self, Vec<Effect>) {
        if enabled == self.enabled {
            return (self.clone(), vec![]);
        }

        let next_fire_at = if enabled && self.status == TriggerStatus::Active {
            self.recurrence.next_occurrence(clock.now())
        } else {
            self.next_fire_at
        };

        let new_state = Trigger {
            enabled,
            next_fire_at,
            ..self.clone()
        };
        let event = if enabled {
            Event::TriggerEnabled {
                id: self.id.clone(),
            }
        } else {
            Event::TriggerDisabled {
                id: self.id.clone(),
            }
        };
        let effects = vec![
            Effect::Emit(event),
            Effect::SaveTrigger {
                id: self.id.clone(),
            },
        ];
        (new_state, effects)
    }

    /// Replace the recurrence (and optionally hooks), recomputing the fire
    /// instant. Editing a spent `Once` trigger reactivates it.
    pub fn reschedule(&self, recurrence: Recurrence, clock: &impl Clock) -> (Self, Vec<Effect>) {
        let next_fire_at = recurrence.next_occurrence(clock.now());
        let new_state = Trigger {
            recurrence,
            status: TriggerStatus::Active,
            next_fire_at,
            ..self.clone()
        };
        let effects = vec![
            Effect::Emit(Event::TriggerUpdated {
                id: self.id.clone(),
            }),
            Effect::SaveTrigger {
                id: self.id.clone(),
            },
        ];
        (new_state, effects)
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
