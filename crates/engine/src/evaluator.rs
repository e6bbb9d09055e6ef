// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger evaluator: the cooperative scheduling loop
//!
//! A single task scans the trigger store on a fixed tick and fires every
//! enabled trigger whose `next_fire_at` has passed. Firing persists the
//! recomputed trigger *before* enqueueing it to the action runner, so a
//! crash between the two loses at most one execution and never duplicates
//! one. The tick itself never blocks on anything but the store write and a
//! channel send.

use crate::events::EventSink;
use sk_core::{Clock, Effect, Event, Trigger};
use sk_store::{StoreError, TriggerStore};
use std::time::Duration;
use tokio::sync::mpsc;

/// Scans triggers and hands due ones to the action runner
pub struct TriggerEvaluator<K: Clock> {
    store: TriggerStore,
    clock: K,
    sink: EventSink,
    queue: mpsc::UnboundedSender<Trigger>,
    tick_interval: Duration,
}

impl<K: Clock> Clone for TriggerEvaluator<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            sink: self.sink.clone(),
            queue: self.queue.clone(),
            tick_interval: self.tick_interval,
        }
    }
}

impl<K: Clock> TriggerEvaluator<K> {
    pub fn new(
        store: TriggerStore,
        clock: K,
        sink: EventSink,
        queue: mpsc::UnboundedSender<Trigger>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            sink,
            queue,
            tick_interval,
        }
    }

    /// One evaluation pass; returns how many triggers fired
    pub fn tick(&self) -> usize {
        self.evaluate(false)
    }

    /// Startup pass: fires triggers whose instant elapsed while the process
    /// was down, at most once each, and marks them as catch-up fires.
    /// Must run after the store reload and before the first regular tick.
    pub fn catch_up(&self) -> usize {
        self.evaluate(true)
    }

    fn evaluate(&self, catch_up: bool) -> usize {
        let now = self.clock.now();
        let triggers = match self.store.list(true) {
            Ok(triggers) => triggers,
            Err(e) => {
                tracing::error!(error = %e, "failed to list triggers, skipping tick");
                return 0;
            }
        };

        let mut fired_count = 0;
        for trigger in triggers {
            if !trigger.is_due(now) {
                continue;
            }
            let scheduled_for = trigger.next_fire_at;

            let (fired, effects) = trigger.fire(&self.clock);
            match self.store.update(&fired) {
                Ok(_) => {}
                Err(StoreError::VersionConflict { id, .. }) => {
                    // Concurrent edit won; the edited trigger re-evaluates
                    // next tick with its recomputed fire time.
                    tracing::debug!(trigger = %id, "skipping fire, document changed underneath");
                    continue;
                }
                Err(e) => {
                    tracing::error!(trigger = %trigger.id, error = %e, "failed to persist fired trigger, not executing");
                    continue;
                }
            }

            for effect in effects {
                match effect {
                    Effect::Emit(event) => self.sink.emit(event, now),
                    // The update above was the SaveTrigger execution.
                    Effect::SaveTrigger { .. } | Effect::SaveStudio { .. } => {}
                }
            }
            if catch_up {
                if let Some(scheduled_for) = scheduled_for {
                    self.sink.emit(
                        Event::TriggerCaughtUp {
                            id: fired.id.clone(),
                            scheduled_for,
                            fired_at: now,
                        },
                        now,
                    );
                }
            }

            fired_count += 1;
            if self.queue.send(fired).is_err() {
                tracing::error!("action runner queue closed, stopping evaluation");
                break;
            }
        }

        fired_count
    }

    /// Run the evaluation loop until the task is aborted
    pub async fn run_loop(self) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let fired = self.tick();
            if fired > 0 {
                tracing::info!(fired, "evaluator tick fired triggers");
            }
        }
    }
}
