// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control client
//!
//! Talks JSON over HTTP to the studio lifecycle API. `ureq` is a blocking
//! client, so every call runs on the tokio blocking pool; the engine only
//! ever awaits these through per-studio tasks, so the pool is never under
//! contention from the evaluator loop.

use crate::client::{ControlClient, ControlError, RemoteStatus};
use async_trait::async_trait;
use serde::Deserialize;
use sk_core::{MachineType, StudioId};
use std::time::Duration;

/// JSON body of a status response
#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

/// HTTP implementation of the control API boundary
#[derive(Clone)]
pub struct HttpControlClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpControlClient {
    /// Create a client against the given API base URL.
    ///
    /// `token` is the bearer credential resolved by the caller (the daemon
    /// reads it from the configured environment variable).
    pub fn new(base_url: impl Into<String>, token: Option<String>, request_timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(request_timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn studio_url(&self, id: &StudioId) -> String {
        format!(
            "{}/studios/{}/{}/{}",
            self.base_url, id.owner, id.teamspace, id.name
        )
    }

    fn get_status(&self, id: &StudioId) -> Result<RemoteStatus, ControlError> {
        let url = self.studio_url(id);
        let mut request = self.agent.get(&url);
        if let Some(token) = &self.token {
            request = request.header("authorization", &format!("Bearer {}", token));
        }

        let mut response = request.call().map_err(|e| map_error(e, id))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ControlError::Transient {
                message: format!("failed to read response: {}", e),
            })?;

        let parsed: StatusBody =
            serde_json::from_str(&body).map_err(|e| ControlError::Terminal {
                message: format!("malformed status body: {}", e),
            })?;
        RemoteStatus::parse(&parsed.status)
    }

    fn post_command(&self, id: &StudioId, command: &str, body: String) -> Result<(), ControlError> {
        let url = format!("{}/{}", self.studio_url(id), command);
        let mut request = self
            .agent
            .post(&url)
            .header("content-type", "application/json");
        if let Some(token) = &self.token {
            request = request.header("authorization", &format!("Bearer {}", token));
        }

        request.send(body.as_str()).map_err(|e| map_error(e, id))?;
        Ok(())
    }
}

/// Map transport and HTTP status failures onto the error taxonomy
fn map_error(err: ureq::Error, id: &StudioId) -> ControlError {
    match err {
        ureq::Error::StatusCode(code) if code == 401 || code == 403 => ControlError::Auth {
            message: format!("status {}", code),
        },
        ureq::Error::StatusCode(404) => ControlError::NotFound(id.clone()),
        ureq::Error::StatusCode(code) if code < 500 => ControlError::Terminal {
            message: format!("status {}", code),
        },
        // 5xx and transport-level failures (DNS, refused, timeout) retry
        other => ControlError::Transient {
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ControlClient for HttpControlClient {
    async fn poll(&self, id: &StudioId) -> Result<RemoteStatus, ControlError> {
        let client = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || client.get_status(&id))
            .await
            .map_err(|e| ControlError::Transient {
                message: format!("poll task failed: {}", e),
            })?
    }

    async fn start(&self, id: &StudioId, machine_type: MachineType) -> Result<(), ControlError> {
        let client = self.clone();
        let id = id.clone();
        let body = format!("{{\"machine_type\":\"{}\"}}", machine_type);
        tokio::task::spawn_blocking(move || client.post_command(&id, "start", body))
            .await
            .map_err(|e| ControlError::Transient {
                message: format!("start task failed: {}", e),
            })?
    }

    async fn stop(&self, id: &StudioId) -> Result<(), ControlError> {
        let client = self.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || client.post_command(&id, "stop", String::new()))
            .await
            .map_err(|e| ControlError::Transient {
                message: format!("stop task failed: {}", e),
            })?
    }
}
