// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake control client for testing

use crate::client::{ControlClient, ControlError, RemoteStatus};
use async_trait::async_trait;
use sk_core::{MachineType, StudioId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Recorded control API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    Poll(StudioId),
    Start(StudioId, MachineType),
    Stop(StudioId),
}

#[derive(Default)]
struct FakeState {
    /// Scripted poll outcomes per studio, consumed in order; when the queue
    /// runs dry the last scripted outcome repeats.
    poll_script: HashMap<StudioId, VecDeque<Result<RemoteStatus, ControlError>>>,
    last_poll: HashMap<StudioId, Result<RemoteStatus, ControlError>>,
    start_result: Option<ControlError>,
    stop_result: Option<ControlError>,
    calls: Vec<ControlCall>,
}

/// Fake control client with scriptable responses
#[derive(Clone, Default)]
pub struct FakeControlClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeControlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a poll outcome for a studio
    pub fn push_poll(&self, id: &StudioId, outcome: Result<RemoteStatus, ControlError>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .poll_script
            .entry(id.clone())
            .or_default()
            .push_back(outcome);
    }

    /// Queue the same poll outcome n times
    pub fn push_poll_n(&self, id: &StudioId, outcome: Result<RemoteStatus, ControlError>, n: usize) {
        for _ in 0..n {
            self.push_poll(id, outcome.clone());
        }
    }

    /// Make every subsequent start call fail
    pub fn fail_start(&self, error: ControlError) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.start_result = Some(error);
    }

    /// Make every subsequent stop call fail
    pub fn fail_stop(&self, error: ControlError) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.stop_result = Some(error);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ControlCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Count recorded calls matching a predicate
    pub fn call_count(&self, predicate: impl Fn(&ControlCall) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl ControlClient for FakeControlClient {
    async fn poll(&self, id: &StudioId) -> Result<RemoteStatus, ControlError> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;
        state.calls.push(ControlCall::Poll(id.clone()));

        if let Some(queue) = state.poll_script.get_mut(id) {
            if let Some(outcome) = queue.pop_front() {
                state.last_poll.insert(id.clone(), outcome.clone());
                return outcome;
            }
        }
        state
            .last_poll
            .get(id)
            .cloned()
            .unwrap_or(Ok(RemoteStatus::Stopped))
    }

    async fn start(&self, id: &StudioId, machine_type: MachineType) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ControlCall::Start(id.clone(), machine_type));
        match &state.start_result {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn stop(&self, id: &StudioId) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ControlCall::Stop(id.clone()));
        match &state.stop_result {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
