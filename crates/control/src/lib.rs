// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Control-API adapters for studio lifecycle operations

pub mod client;
pub mod http;
pub mod traced;

mod fake;

pub use client::{ControlClient, ControlError, RemoteStatus};
pub use http::HttpControlClient;
pub use traced::TracedControlClient;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ControlCall, FakeControlClient};
