// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::monitor::MonitorError;
use sk_core::trigger::ValidationError;
use sk_core::{EventLogError, StudioId, TriggerId};
use sk_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the runtime's scheduling API
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error("invalid trigger: {0}")]
    Validation(#[from] ValidationError),
    #[error("unknown studio: {0}")]
    UnknownStudio(StudioId),
    #[error("trigger not found: {0}")]
    TriggerNotFound(TriggerId),
}
