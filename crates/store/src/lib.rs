// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable persistence for triggers and studio observations
//!
//! Every write is an atomic replace: the document is written to a temp file
//! in the same directory, fsynced, then renamed over the target. A failed
//! write leaves the prior document intact.

mod atomic;
mod studios;
mod triggers;

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod triggers_tests;


pub use studios::{StudioCache, StudioObservation};
pub use triggers::TriggerStore;

use sk_core::TriggerId;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trigger not found: {0}")]
    NotFound(TriggerId),
    #[error("stale write for trigger {id}: expected version {expected}, found {found}")]
    VersionConflict {
        id: TriggerId,
        expected: u64,
        found: u64,
    },
}
