// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control client trait: the boundary to the remote lifecycle API
//!
//! Operations are asynchronous and fallible; errors distinguish transient
//! conditions (retried by the next poll cycle) from terminal rejections
//! (surfaced immediately).

use async_trait::async_trait;
use sk_core::{MachineType, StudioId, StudioState};
use thiserror::Error;

/// Lifecycle state as reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Stopped,
    Pending,
    Running,
    Stopping,
    Failed,
}

impl RemoteStatus {
    /// Map the remote vocabulary onto the cached state model
    pub fn to_state(&self) -> StudioState {
        match self {
            RemoteStatus::Stopped => StudioState::Stopped,
            RemoteStatus::Pending => StudioState::Starting,
            RemoteStatus::Running => StudioState::Running,
            RemoteStatus::Stopping => StudioState::Stopping,
            RemoteStatus::Failed => StudioState::Error {
                reason: "reported failed by control API".to_string(),
            },
        }
    }

    /// Parse the remote API's status string
    pub fn parse(s: &str) -> Result<Self, ControlError> {
        match s.to_ascii_lowercase().as_str() {
            "stopped" => Ok(RemoteStatus::Stopped),
            "pending" | "starting" => Ok(RemoteStatus::Pending),
            "running" => Ok(RemoteStatus::Running),
            "stopping" => Ok(RemoteStatus::Stopping),
            "failed" => Ok(RemoteStatus::Failed),
            other => Err(ControlError::Terminal {
                message: format!("unrecognized status: {}", other),
            }),
        }
    }
}

/// Errors from control API operations
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    /// Network error or timeout; the next poll cycle retries
    #[error("transient control error: {message}")]
    Transient { message: String },
    /// Explicit rejection by the API
    #[error("control API rejected request: {message}")]
    Terminal { message: String },
    /// Credentials missing or refused
    #[error("control API authentication failed: {message}")]
    Auth { message: String },
    /// The studio does not exist remotely
    #[error("studio not found: {0}")]
    NotFound(StudioId),
}

impl ControlError {
    /// Whether the next poll cycle should retry silently
    pub fn is_transient(&self) -> bool {
        matches!(self, ControlError::Transient { .. })
    }
}

/// Adapter for the remote studio lifecycle API
#[async_trait]
pub trait ControlClient: Clone + Send + Sync + 'static {
    /// Fetch the current lifecycle state
    async fn poll(&self, id: &StudioId) -> Result<RemoteStatus, ControlError>;

    /// Request a start; returns once the API accepted the command, long
    /// before the studio is actually running
    async fn start(&self, id: &StudioId, machine_type: MachineType) -> Result<(), ControlError>;

    /// Request a stop; returns once the API accepted the command
    async fn stop(&self, id: &StudioId) -> Result<(), ControlError>;
}
