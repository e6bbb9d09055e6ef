// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action runner: executes fired triggers
//!
//! One execution produces exactly one record, whatever happens. For a stop,
//! the pre-stop hook runs to completion (or its timeout) strictly before
//! the stop request goes out, so shutdown hooks still reach a live studio.
//! For a start, the post-start hook runs once the studio is confirmed
//! running — or once the wait times out, since the studio may well be up
//! without the confirmation having landed yet; the record still classifies
//! an unconfirmed transition as a failure.

use crate::events::EventSink;
use crate::hooks::HookRunner;
use crate::monitor::{StateMonitor, TransitionStatus};
use sk_control::ControlClient;
use sk_core::{
    classify_outcome, Clock, Event, ExecutionRecord, HookOutcome, Trigger, TriggerAction,
};
use std::time::Duration;

/// Executes trigger actions with their hooks and records the outcome
pub struct ActionRunner<C: ControlClient, K: Clock> {
    monitor: StateMonitor<C, K>,
    hooks: HookRunner,
    clock: K,
    sink: EventSink,
    /// How long to wait for transition confirmation
    wait_timeout: Duration,
}

impl<C: ControlClient, K: Clock + 'static> ActionRunner<C, K> {
    pub fn new(
        monitor: StateMonitor<C, K>,
        hooks: HookRunner,
        clock: K,
        sink: EventSink,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            monitor,
            hooks,
            clock,
            sink,
            wait_timeout,
        }
    }

    /// Execute one fired trigger and record the outcome
    pub async fn run(&self, trigger: &Trigger) -> ExecutionRecord {
        let fired_at = self.clock.now();
        tracing::info!(
            trigger = %trigger.id,
            studio = %trigger.studio,
            action = %trigger.action,
            "executing trigger"
        );

        let (transition_ok, error, hook) = match trigger.action {
            TriggerAction::Start => self.run_start(trigger).await,
            TriggerAction::Stop => self.run_stop(trigger).await,
        };

        let outcome = classify_outcome(transition_ok, hook.as_ref());
        let finished_at = self.clock.now();
        let record = ExecutionRecord {
            trigger_id: trigger.id.clone(),
            trigger_name: trigger.name.clone(),
            studio: trigger.studio.clone(),
            action: trigger.action,
            fired_at,
            hook,
            outcome,
            error,
            duration_ms: (finished_at - fired_at).num_milliseconds().max(0) as u64,
        };

        tracing::info!(
            trigger = %trigger.id,
            outcome = %record.outcome,
            duration_ms = record.duration_ms,
            "execution finished"
        );
        self.sink.emit(
            Event::ExecutionRecorded {
                record: record.clone(),
            },
            finished_at,
        );
        record
    }

    async fn run_start(
        &self,
        trigger: &Trigger,
    ) -> (bool, Option<String>, Option<HookOutcome>) {
        let handle = match self
            .monitor
            .request_transition(
                &trigger.studio,
                TriggerAction::Start,
                Some(trigger.machine_type),
            )
            .await
        {
            Ok(handle) => handle,
            // The request itself failed (conflict or rejection): no hook.
            Err(e) => return (false, Some(e.to_string()), None),
        };

        let (ok, error, run_hook) = self.await_confirmation(handle).await;
        let hook = match (&trigger.post_start_hook, run_hook) {
            (Some(spec), true) => Some(self.hooks.run(spec, &self.clock).await),
            _ => None,
        };
        (ok, error, hook)
    }

    async fn run_stop(&self, trigger: &Trigger) -> (bool, Option<String>, Option<HookOutcome>) {
        // Hook first, then the stop request: completion or timeout of the
        // hook strictly precedes the transition.
        let hook = match &trigger.pre_stop_hook {
            Some(spec) => Some(self.hooks.run(spec, &self.clock).await),
            None => None,
        };

        let handle = match self
            .monitor
            .request_transition(&trigger.studio, TriggerAction::Stop, None)
            .await
        {
            Ok(handle) => handle,
            Err(e) => return (false, Some(e.to_string()), hook),
        };

        let (ok, error, _) = self.await_confirmation(handle).await;
        (ok, error, hook)
    }

    /// Wait for a transition to resolve, bounded by the wait timeout.
    ///
    /// Returns (confirmed, error, hook-still-runs): on a wait timeout the
    /// post-start hook still runs, but the transition counts as failed.
    async fn await_confirmation(
        &self,
        mut handle: crate::monitor::TransitionHandle,
    ) -> (bool, Option<String>, bool) {
        match tokio::time::timeout(self.wait_timeout, handle.wait()).await {
            Ok(TransitionStatus::Completed) => (true, None, true),
            Ok(TransitionStatus::TimedOut) => (
                false,
                Some("transition timed out before confirmation".to_string()),
                true,
            ),
            Ok(TransitionStatus::Cancelled) => {
                (false, Some("transition cancelled".to_string()), false)
            }
            Ok(TransitionStatus::Pending) => (
                false,
                Some("monitor stopped before confirmation".to_string()),
                false,
            ),
            Err(_) => (
                false,
                Some("timed out waiting for confirmation".to_string()),
                true,
            ),
        }
    }
}
