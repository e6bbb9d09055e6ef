// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime: owns the engine components and exposes the scheduling API
//!
//! The daemon constructs one Runtime, calls `catch_up` after the store
//! reload, then `start` to spawn the poll loops, the evaluator tick, and
//! the execution dispatcher. API calls return immediately with current or
//! pending state; nothing here blocks on remote completion.

use crate::error::EngineError;
use crate::evaluator::TriggerEvaluator;
use crate::events::EventSink;
use crate::hooks::HookRunner;
use crate::monitor::StateMonitor;
use crate::runner::ActionRunner;
use chrono::{DateTime, Utc};
use sk_control::ControlClient;
use sk_core::config::{EngineSettings, StudioEntry};
use sk_core::{
    Clock, Effect, Event, EventBus, EventLog, EventPattern, EventRecord, IdGen, Recurrence,
    Studio, StudioId, StudioState, Trigger, TriggerConfig, TriggerId,
};
use sk_store::{StudioCache, TriggerStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// External dependencies injected into the runtime
pub struct RuntimeDeps<C, K, I> {
    pub control: C,
    pub clock: K,
    pub id_gen: I,
    pub triggers: TriggerStore,
    pub studios: StudioCache,
    pub log: Arc<Mutex<EventLog>>,
}

/// The assembled engine
pub struct Runtime<C: ControlClient, K: Clock, I: IdGen> {
    settings: EngineSettings,
    clock: K,
    id_gen: I,
    sink: EventSink,
    triggers: TriggerStore,
    monitor: StateMonitor<C, K>,
    evaluator: TriggerEvaluator<K>,
    runner: Arc<ActionRunner<C, K>>,
    fired_rx: Option<mpsc::UnboundedReceiver<Trigger>>,
    studio_ids: Vec<StudioId>,
}

impl<C: ControlClient, K: Clock + 'static, I: IdGen> Runtime<C, K, I> {
    /// Assemble the engine and register the configured studios
    pub fn new(deps: RuntimeDeps<C, K, I>, settings: EngineSettings, studios: &[StudioEntry]) -> Self {
        let bus = EventBus::new();
        let sink = EventSink::new(bus, deps.log);

        let monitor = StateMonitor::new(
            deps.control,
            deps.clock.clone(),
            sink.clone(),
            deps.studios,
            settings.poll_interval,
            settings.failure_threshold,
            settings.transition_timeout,
        );

        let mut studio_ids = Vec::new();
        for entry in studios {
            let id = entry.id();
            monitor.register(id.clone(), entry.machine_type);
            studio_ids.push(id);
        }

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let evaluator = TriggerEvaluator::new(
            deps.triggers.clone(),
            deps.clock.clone(),
            sink.clone(),
            fired_tx,
            settings.tick_interval,
        );

        let hooks = HookRunner::new(settings.hook_profile.clone(), settings.hook_grace);
        let runner = Arc::new(ActionRunner::new(
            monitor.clone(),
            hooks,
            deps.clock.clone(),
            sink.clone(),
            settings.transition_timeout,
        ));

        Self {
            settings,
            clock: deps.clock,
            id_gen: deps.id_gen,
            sink,
            triggers: deps.triggers,
            monitor,
            evaluator,
            runner,
            fired_rx: Some(fired_rx),
            studio_ids,
        }
    }

    /// Fire any triggers whose instant elapsed while the process was down.
    /// Runs once, after the store reload, before `start`.
    pub fn catch_up(&self) -> usize {
        let fired = self.evaluator.catch_up();
        if fired > 0 {
            tracing::info!(fired, "catch-up fired past-due triggers");
        }
        fired
    }

    /// Spawn the poll loops, the evaluator tick, and the execution
    /// dispatcher. Idempotence is not needed: the daemon calls this once.
    pub fn start(&mut self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        for id in &self.studio_ids {
            let monitor = self.monitor.clone();
            tasks.push(tokio::spawn(monitor.run_poll_loop(id.clone())));
        }

        tasks.push(tokio::spawn(self.evaluator.clone().run_loop()));

        if let Some(fired_rx) = self.fired_rx.take() {
            let runner = Arc::clone(&self.runner);
            tasks.push(tokio::spawn(dispatch_executions(fired_rx, runner)));
        }

        tasks
    }

    // ------------------------------------------------------------------
    // Scheduling API (exposed through the daemon protocol)
    // ------------------------------------------------------------------

    /// Create a trigger; durable before returning
    pub fn create_trigger(&self, config: TriggerConfig) -> Result<Trigger, EngineError> {
        if !self.monitor.is_registered(&config.studio) {
            return Err(EngineError::UnknownStudio(config.studio.clone()));
        }
        let now = self.clock.now();
        config.validate(now)?;

        let trigger = Trigger::new(TriggerId::new(self.id_gen.next()), config, &self.clock);
        let stored = self.triggers.create(&trigger)?;
        self.sink.emit(
            Event::TriggerCreated {
                id: stored.id.clone(),
                name: stored.name.clone(),
                studio: stored.studio.clone(),
            },
            now,
        );
        Ok(stored)
    }

    /// Read one trigger
    pub fn get_trigger(&self, id: &TriggerId) -> Result<Trigger, EngineError> {
        Ok(self.triggers.get(id)?)
    }

    /// List triggers
    pub fn list_triggers(&self, enabled_only: bool) -> Result<Vec<Trigger>, EngineError> {
        Ok(self.triggers.list(enabled_only)?)
    }

    /// Delete a trigger. An in-flight execution is not aborted.
    pub fn delete_trigger(&self, id: &TriggerId) -> Result<(), EngineError> {
        self.triggers.delete(id)?;
        self.sink
            .emit(Event::TriggerDeleted { id: id.clone() }, self.clock.now());
        Ok(())
    }

    /// Enable or disable a trigger
    pub fn set_trigger_enabled(
        &self,
        id: &TriggerId,
        enabled: bool,
    ) -> Result<Trigger, EngineError> {
        let trigger = self.triggers.get(id)?;
        let (updated, effects) = trigger.set_enabled(enabled, &self.clock);
        if effects.is_empty() {
            return Ok(updated);
        }
        self.apply_trigger_effects(&updated, effects)
    }

    /// Replace a trigger's recurrence, recomputing its fire instant
    pub fn reschedule_trigger(
        &self,
        id: &TriggerId,
        recurrence: Recurrence,
    ) -> Result<Trigger, EngineError> {
        let trigger = self.triggers.get(id)?;
        let (updated, effects) = trigger.reschedule(recurrence, &self.clock);
        self.apply_trigger_effects(&updated, effects)
    }

    fn apply_trigger_effects(
        &self,
        updated: &Trigger,
        effects: Vec<Effect>,
    ) -> Result<Trigger, EngineError> {
        let mut stored = updated.clone();
        for effect in effects {
            match effect {
                Effect::SaveTrigger { .. } => {
                    stored = self.triggers.update(&stored)?;
                }
                Effect::Emit(event) => self.sink.emit(event, self.clock.now()),
                Effect::SaveStudio { .. } => {}
            }
        }
        Ok(stored)
    }

    /// Snapshot of all monitored studios
    pub fn studios(&self) -> Vec<Studio> {
        self.monitor.studios()
    }

    /// Cached state of one studio
    pub fn studio_state(&self, id: &StudioId) -> Option<(StudioState, Option<DateTime<Utc>>)> {
        self.monitor.current(id)
    }

    /// Request a manual transition; returns the pending state immediately.
    ///
    /// Confirmation happens in the background via polling; the caller
    /// watches events or re-queries state.
    pub async fn request_transition(
        &self,
        id: &StudioId,
        action: sk_core::TriggerAction,
        machine_type: Option<sk_core::MachineType>,
    ) -> Result<StudioState, EngineError> {
        let handle = self
            .monitor
            .request_transition(id, action, machine_type)
            .await?;
        drop(handle); // confirmation continues in the poll loop
        Ok(self
            .monitor
            .current(id)
            .map(|(state, _)| state)
            .unwrap_or(StudioState::Unknown))
    }

    /// Cancel the in-flight transition for a studio, if any
    pub fn cancel_transition(&self, id: &StudioId) -> bool {
        self.monitor.cancel_transition(id)
    }

    /// Subscribe to live events
    pub fn subscribe(
        &self,
        patterns: Vec<EventPattern>,
    ) -> (sk_core::events::SubscriberId, sk_core::events::EventReceiver) {
        self.sink.bus().subscribe(patterns)
    }

    /// Events after a sequence number
    pub fn events_since(&self, sequence: u64) -> Result<Vec<EventRecord>, EngineError> {
        let log = self.sink.log();
        let log = log.lock().unwrap_or_else(|e| e.into_inner());
        Ok(log.since(sequence)?)
    }

    /// Events matching a name pattern
    pub fn events_matching(&self, pattern: &EventPattern) -> Result<Vec<EventRecord>, EngineError> {
        let log = self.sink.log();
        let log = log.lock().unwrap_or_else(|e| e.into_inner());
        Ok(log.query(pattern)?)
    }

    /// Events within a time range
    pub fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, EngineError> {
        let log = self.sink.log();
        let log = log.lock().unwrap_or_else(|e| e.into_inner());
        Ok(log.between(from, to)?)
    }

    /// Engine settings in effect
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// Dispatch fired triggers to per-studio workers.
///
/// One worker task per studio consumes that studio's queue in order, which
/// gives per-resource serialization (and per-trigger record ordering) while
/// distinct studios execute fully in parallel.
async fn dispatch_executions<C: ControlClient, K: Clock + 'static>(
    mut fired_rx: mpsc::UnboundedReceiver<Trigger>,
    runner: Arc<ActionRunner<C, K>>,
) {
    let mut workers: HashMap<StudioId, mpsc::UnboundedSender<Trigger>> = HashMap::new();

    while let Some(trigger) = fired_rx.recv().await {
        let studio = trigger.studio.clone();
        let worker = workers.entry(studio.clone()).or_insert_with(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<Trigger>();
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                while let Some(trigger) = rx.recv().await {
                    runner.run(&trigger).await;
                }
            });
            tx
        });
        let send_failed = worker.send(trigger).is_err();
        if send_failed {
            tracing::error!(studio = %studio, "execution worker died, dropping fired trigger");
            workers.remove(&studio);
        }
    }
}
