// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for routing events to subscribers

use crate::event::Event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Receiver for event delivery
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Handle for unsubscribing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Pattern for matching event names
///
/// Supports exact names ("trigger:fired"), a category prefix
/// ("trigger:*"), and the match-all pattern ("*").
#[derive(Debug, Clone)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Check if this pattern matches an event name
    pub fn matches(&self, event_name: &str) -> bool {
        if self.0 == "*" {
            return true;
        }
        if let Some(prefix) = self.0.strip_suffix(":*") {
            return event_name
                .split(':')
                .next()
                .is_some_and(|category| category == prefix);
        }
        self.0 == event_name
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct Subscriber {
    patterns: Vec<EventPattern>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Subscriber {
    fn matches(&self, event_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(event_name))
    }
}

/// The event bus routes events to matching subscribers
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events matching any of the given patterns
    pub fn subscribe(&self, patterns: Vec<EventPattern>) -> (SubscriberId, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.insert(id, Subscriber { patterns, tx });

        (id, rx)
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(&id);
    }

    /// Publish an event to all matching subscribers.
    ///
    /// Subscribers whose receiver has been dropped are pruned lazily here.
    pub fn publish(&self, event: &Event) {
        let event_name = event.name();

        let mut dropped = Vec::new();
        {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, sub) in subs.iter() {
                if sub.matches(event_name) && sub.tx.send(event.clone()).is_err() {
                    dropped.push(*id);
                }
            }
        }
        if !dropped.is_empty() {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            for id in dropped {
                subs.remove(&id);
            }
        }
    }

    /// Get count of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
