// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sk-daemon: background process owning the scheduling engine
//!
//! The binary (`skd`) runs the engine loops and serves the scheduling API
//! over a Unix socket; this library exposes the wire protocol and lifecycle
//! types so the CLI can speak to it.

pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use protocol::{
    Query, Request, Response, StudioSummary, TriggerSummary, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
