// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Studio identity and lifecycle state machine
//!
//! A Studio is a remotely-hosted compute instance whose lifecycle is
//! controlled through an asynchronous API. The state machine here is pure:
//! it consumes poll outcomes and transition requests, and returns the new
//! state plus effects for the engine to execute. Only the State Monitor
//! applies these transitions.

use crate::clock::Clock;
use crate::effect::Effect;
use crate::event::Event;
use crate::trigger::TriggerAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a studio: name within a teamspace owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudioId {
    pub name: String,
    pub teamspace: String,
    pub owner: String,
}

impl StudioId {
    pub fn new(
        name: impl Into<String>,
        teamspace: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            teamspace: teamspace.into(),
            owner: owner.into(),
        }
    }

    /// Filesystem-safe key for cache documents
    pub fn key(&self) -> String {
        format!("{}--{}--{}", self.owner, self.teamspace, self.name)
    }
}

impl fmt::Display for StudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.teamspace, self.name)
    }
}

impl FromStr for StudioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [owner, teamspace, name] if !owner.is_empty() && !teamspace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*name, *teamspace, *owner))
            }
            _ => Err(format!("expected owner/teamspace/name, got: {}", s)),
        }
    }
}

/// Machine type a studio runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    #[default]
    Cpu,
    Gpu,
    GpuFast,
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineType::Cpu => write!(f, "cpu"),
            MachineType::Gpu => write!(f, "gpu"),
            MachineType::GpuFast => write!(f, "gpu_fast"),
        }
    }
}

impl FromStr for MachineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(MachineType::Cpu),
            "gpu" => Ok(MachineType::Gpu),
            "gpu_fast" => Ok(MachineType::GpuFast),
            _ => Err(format!("unknown machine type: {}", s)),
        }
    }
}

/// Lifecycle state of a studio as last observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StudioState {
    /// Not yet observed since process start
    Unknown,
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Control API rejected us or polling degraded past the failure threshold
    Error { reason: String },
}

impl StudioState {
    /// Short name for event routing and display
    pub fn name(&self) -> &'static str {
        match self {
            StudioState::Unknown => "unknown",
            StudioState::Stopped => "stopped",
            StudioState::Starting => "starting",
            StudioState::Running => "running",
            StudioState::Stopping => "stopping",
            StudioState::Error { .. } => "error",
        }
    }

    /// Whether this state is a settled observation (not mid-transition)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StudioState::Stopped | StudioState::Running | StudioState::Error { .. }
        )
    }
}

impl fmt::Display for StudioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudioState::Error { reason } => write!(f, "error ({})", reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Outcome of one control-API poll, as seen by the state machine
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The API answered with a lifecycle state
    Observed(StudioState),
    /// The call failed (network error, timeout, rejection)
    Failed { reason: String },
}

/// A studio and its last-known lifecycle state
///
/// Re-created as `Unknown` on process restart; the first successful poll
/// establishes the real state.
#[derive(Debug, Clone)]
pub struct Studio {
    pub id: StudioId,
    pub state: StudioState,
    /// When the state was last successfully observed
    pub observed_at: Option<DateTime<Utc>>,
    /// Machine type last used to start this studio
    pub machine_type: MachineType,
    /// Consecutive failed polls since the last success
    pub consecutive_failures: u32,
}

impl Studio {
    pub fn new(id: StudioId) -> Self {
        Self {
            id,
            state: StudioState::Unknown,
            observed_at: None,
            machine_type: MachineType::default(),
            consecutive_failures: 0,
        }
    }

    /// Apply one poll outcome.
    ///
    /// A successful observation resets the failure counter and, when the
    /// state differs from the cached one, emits exactly one state-change
    /// event. A failed poll never overwrites the cached state; it counts
    /// toward `failure_threshold`, at which point the cached state degrades
    /// to `Error` so consumers see the problem instead of stale optimism.
    pub fn observe(
        &self,
        outcome: PollOutcome,
        failure_threshold: u32,
        clock: &impl Clock,
    ) -> (Self, Vec<Effect>) {
        match outcome {
            PollOutcome::Observed(observed) => {
                let now = clock.now();
                let changed = observed != self.state;
                let new_state = Studio {
                    state: observed.clone(),
                    observed_at: Some(now),
                    consecutive_failures: 0,
                    ..self.clone()
                };
                let effects = if changed {
                    vec![
                        Effect::Emit(Event::StudioStateChanged {
                            studio: self.id.clone(),
                            from: self.state.clone(),
                            to: observed,
                            observed_at: now,
                        }),
                        Effect::SaveStudio {
                            id: self.id.clone(),
                        },
                    ]
                } else {
                    vec![]
                };
                (new_state, effects)
            }

            PollOutcome::Failed { reason } => {
                let failures = self.consecutive_failures + 1;
                let degraded = failures >= failure_threshold
                    && !matches!(self.state, StudioState::Error { .. });

                if degraded {
                    let now = clock.now();
                    let error = StudioState::Error {
                        reason: reason.clone(),
                    };
                    let new_state = Studio {
                        state: error.clone(),
                        consecutive_failures: failures,
                        ..self.clone()
                    };
                    let effects = vec![
                        Effect::Emit(Event::StudioDegraded {
                            studio: self.id.clone(),
                            reason: reason.clone(),
                            failures,
                        }),
                        Effect::Emit(Event::StudioStateChanged {
                            studio: self.id.clone(),
                            from: self.state.clone(),
                            to: error,
                            observed_at: now,
                        }),
                        Effect::SaveStudio {
                            id: self.id.clone(),
                        },
                    ];
                    (new_state, effects)
                } else {
                    // Below the threshold the cached state is left intact.
                    let new_state = Studio {
                        consecutive_failures: failures,
                        ..self.clone()
                    };
                    (new_state, vec![])
                }
            }
        }
    }

    /// Record that a transition was requested.
    ///
    /// Sets the cached state to the pending intermediate so readers see the
    /// transition immediately, before the next poll confirms it. Conflict
    /// enforcement (one in-flight transition per studio) lives in the
    /// monitor, which owns the in-flight slot.
    pub fn begin_transition(
        &self,
        action: TriggerAction,
        machine_type: Option<MachineType>,
        clock: &impl Clock,
    ) -> (Self, Vec<Effect>) {
        let pending = match action {
            TriggerAction::Start => StudioState::Starting,
            TriggerAction::Stop => StudioState::Stopping,
        };
        let now = clock.now();
        let new_state = Studio {
            state: pending.clone(),
            machine_type: machine_type.unwrap_or(self.machine_type),
            ..self.clone()
        };
        let effects = vec![
            Effect::Emit(Event::TransitionRequested {
                studio: self.id.clone(),
                action,
                machine_type,
            }),
            Effect::Emit(Event::StudioStateChanged {
                studio: self.id.clone(),
                from: self.state.clone(),
                to: pending,
                observed_at: now,
            }),
            Effect::SaveStudio {
                id: self.id.clone(),
            },
        ];
        (new_state, effects)
    }
}

#[cfg(test)]
#[path = "studio_tests.rs"]
mod tests;
