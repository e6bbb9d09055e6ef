// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event distribution: in-process bus and durable log
//!
//! The bus fans events out to live subscribers (dashboards, tests); the log
//! is the append-only audit sink queryable by name pattern, sequence, and
//! time range.

mod bus;
mod log;

#[cfg(test)]
#[path = "bus_tests.rs"]
mod bus_tests;

#[cfg(test)]
#[path = "log_tests.rs"]
mod log_tests;

pub use bus::{EventBus, EventPattern, EventReceiver, SubscriberId};
pub use log::{EventLog, EventLogError, EventRecord};
