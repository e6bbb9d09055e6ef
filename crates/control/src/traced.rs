// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced control client wrapper for consistent observability

use crate::client::{ControlClient, ControlError, RemoteStatus};
use async_trait::async_trait;
use sk_core::{MachineType, StudioId};

/// Wrapper that adds tracing to any ControlClient
#[derive(Clone)]
pub struct TracedControlClient<C> {
    inner: C,
}

impl<C> TracedControlClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ControlClient> ControlClient for TracedControlClient<C> {
    async fn poll(&self, id: &StudioId) -> Result<RemoteStatus, ControlError> {
        let start = std::time::Instant::now();
        let result = self.inner.poll(id).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(status) => tracing::trace!(
                studio = %id,
                status = ?status,
                elapsed_ms = elapsed.as_millis() as u64,
                "polled"
            ),
            Err(e) if e.is_transient() => tracing::debug!(
                studio = %id,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "poll failed (transient)"
            ),
            Err(e) => tracing::warn!(
                studio = %id,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "poll failed"
            ),
        }

        result
    }

    async fn start(&self, id: &StudioId, machine_type: MachineType) -> Result<(), ControlError> {
        let span = tracing::info_span!("control.start", studio = %id, machine = %machine_type);
        let _guard = span.enter();

        tracing::info!("requesting start");
        let start = std::time::Instant::now();
        let result = self.inner.start(id, machine_type).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "start accepted"),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "start rejected"
            ),
        }

        result
    }

    async fn stop(&self, id: &StudioId) -> Result<(), ControlError> {
        let span = tracing::info_span!("control.stop", studio = %id);
        let _guard = span.enter();

        tracing::info!("requesting stop");
        let start = std::time::Instant::now();
        let result = self.inner.stop(id).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "stop accepted"),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "stop rejected"
            ),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
