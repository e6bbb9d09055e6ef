// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State monitor: authoritative lifecycle state per studio
//!
//! One poll task per studio keeps the cached state fresh; transition
//! requests go through here so the one-in-flight rule is enforced against
//! the same lock that guards the cache. Completion of a transition is
//! detected by observation: the next successful poll that sees the target
//! terminal state resolves the handle.

use crate::events::EventSink;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sk_control::{ControlClient, ControlError};
use sk_core::{
    Clock, Effect, Event, MachineType, PollOutcome, Studio, StudioId, StudioState, TriggerAction,
};
use sk_store::StudioCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Errors from monitor operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("studio not registered: {0}")]
    NotRegistered(StudioId),
    /// A transition is already in flight for this studio; the caller must
    /// retry after it resolves
    #[error("transition already in flight for {studio}")]
    Conflict { studio: StudioId },
    #[error("control error: {0}")]
    Control(#[from] ControlError),
}

/// Resolution state of an in-flight transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    /// Remote call accepted, waiting for a poll to confirm the target state
    Pending,
    /// A poll observed the target terminal state
    Completed,
    /// The deadline passed without confirmation
    TimedOut,
    /// The caller stopped waiting; the remote call is not undone
    Cancelled,
}

struct Inflight {
    action: TriggerAction,
    deadline: DateTime<Utc>,
    tx: watch::Sender<TransitionStatus>,
}

struct StudioEntry {
    studio: Studio,
    inflight: Option<Inflight>,
}

type Registry = Arc<Mutex<HashMap<StudioId, StudioEntry>>>;

/// Handle to one in-flight transition
///
/// Can be polled (`status`), awaited (`wait`), or cancelled. Dropping the
/// handle does not cancel: the monitor keeps confirming independently.
pub struct TransitionHandle {
    studio: StudioId,
    action: TriggerAction,
    registry: Registry,
    rx: watch::Receiver<TransitionStatus>,
}

impl TransitionHandle {
    pub fn studio(&self) -> &StudioId {
        &self.studio
    }

    pub fn action(&self) -> TriggerAction {
        self.action
    }

    /// Current resolution state
    pub fn status(&self) -> TransitionStatus {
        *self.rx.borrow()
    }

    /// Wait until the transition resolves.
    ///
    /// Returns `Pending` only if the monitor disappeared underneath us
    /// (sender dropped), which callers treat as a failure.
    pub async fn wait(&mut self) -> TransitionStatus {
        loop {
            let current = *self.rx.borrow_and_update();
            if current != TransitionStatus::Pending {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }

    /// Stop waiting for confirmation.
    ///
    /// Frees the in-flight slot; the remote call already sent is not
    /// undone, and the next poll simply observes whatever state results.
    pub fn cancel(self) -> TransitionStatus {
        resolve_inflight(&self.registry, &self.studio, TransitionStatus::Cancelled)
            .unwrap_or_else(|| self.status())
    }
}

/// Resolve and clear the in-flight slot for a studio, notifying waiters.
/// Returns the status it resolved to, or None if nothing was in flight.
fn resolve_inflight(
    registry: &Registry,
    id: &StudioId,
    status: TransitionStatus,
) -> Option<TransitionStatus> {
    let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
    let entry = map.get_mut(id)?;
    let inflight = entry.inflight.take()?;
    let _ = inflight.tx.send(status);
    Some(status)
}

/// Polls studios and owns their cached lifecycle state
pub struct StateMonitor<C: ControlClient, K: Clock> {
    control: C,
    clock: K,
    sink: EventSink,
    cache: StudioCache,
    registry: Registry,
    poll_interval: Duration,
    failure_threshold: u32,
    transition_timeout: Duration,
}

impl<C: ControlClient, K: Clock> Clone for StateMonitor<C, K> {
    fn clone(&self) -> Self {
        Self {
            control: self.control.clone(),
            clock: self.clock.clone(),
            sink: self.sink.clone(),
            cache: self.cache.clone(),
            registry: Arc::clone(&self.registry),
            poll_interval: self.poll_interval,
            failure_threshold: self.failure_threshold,
            transition_timeout: self.transition_timeout,
        }
    }
}

impl<C: ControlClient, K: Clock + 'static> StateMonitor<C, K> {
    pub fn new(
        control: C,
        clock: K,
        sink: EventSink,
        cache: StudioCache,
        poll_interval: Duration,
        failure_threshold: u32,
        transition_timeout: Duration,
    ) -> Self {
        Self {
            control,
            clock,
            sink,
            cache,
            registry: Arc::new(Mutex::new(HashMap::new())),
            poll_interval,
            failure_threshold,
            transition_timeout,
        }
    }

    /// Register a studio for monitoring. State starts `Unknown` until the
    /// first poll, regardless of what previous runs observed.
    pub fn register(&self, id: StudioId, machine_type: MachineType) {
        let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(id.clone()).or_insert_with(|| {
            let mut studio = Studio::new(id);
            studio.machine_type = machine_type;
            StudioEntry {
                studio,
                inflight: None,
            }
        });
    }

    /// Whether a studio is registered
    pub fn is_registered(&self, id: &StudioId) -> bool {
        let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        map.contains_key(id)
    }

    /// Last cached state and observation time for a studio
    pub fn current(&self, id: &StudioId) -> Option<(StudioState, Option<DateTime<Utc>>)> {
        let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        map.get(id)
            .map(|e| (e.studio.state.clone(), e.studio.observed_at))
    }

    /// Snapshot of all monitored studios
    pub fn studios(&self) -> Vec<Studio> {
        let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let mut studios: Vec<Studio> = map.values().map(|e| e.studio.clone()).collect();
        studios.sort_by(|a, b| a.id.cmp(&b.id));
        studios
    }

    /// Poll one studio and apply the observation.
    ///
    /// A transient control error counts toward the failure threshold; a
    /// terminal one degrades the cached state immediately. Also checks the
    /// in-flight transition for confirmation or deadline expiry, on every
    /// poll regardless of its outcome.
    pub async fn poll_once(&self, id: &StudioId) -> Result<StudioState, MonitorError> {
        let outcome = match self.control.poll(id).await {
            Ok(status) => PollOutcome::Observed(status.to_state()),
            Err(e) if e.is_transient() => PollOutcome::Failed {
                reason: e.to_string(),
            },
            Err(e) => PollOutcome::Observed(StudioState::Error {
                reason: e.to_string(),
            }),
        };

        let now = self.clock.now();
        let (state, effects, resolution) = {
            let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let entry = map
                .get_mut(id)
                .ok_or_else(|| MonitorError::NotRegistered(id.clone()))?;

            let (studio, mut effects) =
                entry
                    .studio
                    .observe(outcome, self.failure_threshold, &self.clock);
            entry.studio = studio;

            let resolution = match &entry.inflight {
                Some(inflight) if entry.studio.state == target_state(inflight.action) => {
                    Some((inflight.action, TransitionStatus::Completed))
                }
                Some(inflight) if now >= inflight.deadline => {
                    Some((inflight.action, TransitionStatus::TimedOut))
                }
                _ => None,
            };

            if let Some((action, status)) = resolution {
                if let Some(inflight) = entry.inflight.take() {
                    let _ = inflight.tx.send(status);
                }
                match status {
                    TransitionStatus::Completed => {
                        effects.push(Effect::Emit(Event::TransitionCompleted {
                            studio: id.clone(),
                            action,
                        }));
                    }
                    TransitionStatus::TimedOut => {
                        // Degrade the cache: the remote never confirmed.
                        let from = entry.studio.state.clone();
                        let error = StudioState::Error {
                            reason: format!("{} transition timed out", action),
                        };
                        entry.studio.state = error.clone();
                        effects.push(Effect::Emit(Event::TransitionTimedOut {
                            studio: id.clone(),
                            action,
                        }));
                        effects.push(Effect::Emit(Event::StudioStateChanged {
                            studio: id.clone(),
                            from,
                            to: error,
                            observed_at: now,
                        }));
                        effects.push(Effect::SaveStudio { id: id.clone() });
                    }
                    _ => {}
                }
            }

            (entry.studio.state.clone(), effects, resolution)
        };

        if let Some((action, status)) = resolution {
            tracing::debug!(studio = %id, action = %action, status = ?status, "transition resolved");
        }
        self.apply(id, effects, now);
        Ok(state)
    }

    /// Request a lifecycle transition.
    ///
    /// At most one transition may be in flight per studio: the slot is
    /// reserved under the registry lock before the remote call goes out, so
    /// a concurrent request fails fast with `Conflict` and leaves the
    /// cached state untouched. The returned handle resolves when a poll
    /// confirms the target state, the deadline passes, or it is cancelled.
    pub async fn request_transition(
        &self,
        id: &StudioId,
        action: TriggerAction,
        machine_type: Option<MachineType>,
    ) -> Result<TransitionHandle, MonitorError> {
        let now = self.clock.now();
        let (tx, rx) = watch::channel(TransitionStatus::Pending);

        // Reserve the slot first; two concurrent requests must not both
        // reach the remote API.
        {
            let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let entry = map
                .get_mut(id)
                .ok_or_else(|| MonitorError::NotRegistered(id.clone()))?;
            if entry.inflight.is_some() {
                return Err(MonitorError::Conflict { studio: id.clone() });
            }
            entry.inflight = Some(Inflight {
                action,
                deadline: now
                    + ChronoDuration::from_std(self.transition_timeout)
                        .unwrap_or_else(|_| ChronoDuration::seconds(600)),
                tx,
            });
        }

        let result = match action {
            TriggerAction::Start => {
                let machine = machine_type.unwrap_or_else(|| self.default_machine(id));
                self.control.start(id, machine).await
            }
            TriggerAction::Stop => self.control.stop(id).await,
        };

        if let Err(e) = result {
            // Remote call failed: release the slot, cache untouched.
            let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = map.get_mut(id) {
                entry.inflight = None;
            }
            return Err(MonitorError::Control(e));
        }

        // Remote accepted: show the pending intermediate state immediately.
        let effects = {
            let mut map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let entry = map
                .get_mut(id)
                .ok_or_else(|| MonitorError::NotRegistered(id.clone()))?;
            let (studio, effects) = entry.studio.begin_transition(action, machine_type, &self.clock);
            entry.studio = studio;
            effects
        };
        self.apply(id, effects, self.clock.now());

        Ok(TransitionHandle {
            studio: id.clone(),
            action,
            registry: Arc::clone(&self.registry),
            rx,
        })
    }

    /// Cancel the in-flight transition for a studio, if any.
    ///
    /// Stops confirmation tracking; the remote call already sent is not
    /// undone. Returns true when something was cancelled.
    pub fn cancel_transition(&self, id: &StudioId) -> bool {
        let action = {
            let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            map.get(id).and_then(|e| e.inflight.as_ref().map(|i| i.action))
        };
        let Some(action) = action else {
            return false;
        };
        if resolve_inflight(&self.registry, id, TransitionStatus::Cancelled).is_some() {
            self.sink.emit(
                Event::TransitionCancelled {
                    studio: id.clone(),
                    action,
                },
                self.clock.now(),
            );
            true
        } else {
            false
        }
    }

    /// Run the poll loop for one studio until the task is aborted
    pub async fn run_poll_loop(self, id: StudioId) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.poll_once(&id).await {
                tracing::warn!(studio = %id, error = %e, "poll failed");
            }
        }
    }

    fn default_machine(&self, id: &StudioId) -> MachineType {
        let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        map.get(id)
            .map(|e| e.studio.machine_type)
            .unwrap_or_default()
    }

    /// Execute effects produced by a studio transition
    fn apply(&self, id: &StudioId, effects: Vec<Effect>, at: DateTime<Utc>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.sink.emit(event, at),
                Effect::SaveStudio { .. } => {
                    let snapshot = {
                        let map = self.registry.lock().unwrap_or_else(|e| e.into_inner());
                        map.get(id).map(|e| e.studio.clone())
                    };
                    if let Some(studio) = snapshot {
                        if let Err(e) = self.cache.save(&studio) {
                            tracing::error!(studio = %id, error = %e, "failed to persist studio observation");
                        }
                    }
                }
                Effect::SaveTrigger { .. } => {
                    // Studio transitions never request trigger writes.
                }
            }
        }
    }
}

/// The terminal state that confirms a transition
fn target_state(action: TriggerAction) -> StudioState {
    match action {
        TriggerAction::Start => StudioState::Running,
        TriggerAction::Stop => StudioState::Stopped,
    }
}
