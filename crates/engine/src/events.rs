// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event sink: durable log first, live fan-out second

use chrono::{DateTime, Utc};
use sk_core::{Event, EventBus, EventLog};
use std::sync::{Arc, Mutex};

/// Shared emission path for all engine components.
///
/// Appends to the durable log before publishing to live subscribers; a log
/// write failure is traced and absorbed so observability problems never
/// take down the engine.
#[derive(Clone)]
pub struct EventSink {
    bus: EventBus,
    log: Arc<Mutex<EventLog>>,
}

impl EventSink {
    pub fn new(bus: EventBus, log: Arc<Mutex<EventLog>>) -> Self {
        Self { bus, log }
    }

    /// Emit one event
    pub fn emit(&self, event: Event, at: DateTime<Utc>) {
        {
            let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = log.append(event.clone(), at) {
                tracing::error!(event = event.name(), error = %e, "failed to append event to log");
            }
        }
        self.bus.publish(&event);
    }

    /// Access the underlying bus (for subscriptions)
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Access the underlying log (for queries)
    pub fn log(&self) -> Arc<Mutex<EventLog>> {
        Arc::clone(&self.log)
    }
}
