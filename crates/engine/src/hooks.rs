// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook command execution
//!
//! Hooks are opaque user-supplied command strings run through a configured
//! execution profile (interpreter + args). Every hook carries its own
//! timeout; a hook that exceeds it is killed and whatever output it
//! produced up to that point is still captured. Total wall time is bounded
//! by timeout + grace.

use sk_core::config::ExecutionProfile;
use sk_core::{Clock, HookOutcome, HookSpec};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Captured output is capped so a chatty hook cannot bloat records
const MAX_CAPTURE: usize = 64 * 1024;

/// Executes hook commands with timeouts and output capture
#[derive(Clone)]
pub struct HookRunner {
    profile: ExecutionProfile,
    grace: Duration,
}

impl HookRunner {
    pub fn new(profile: ExecutionProfile, grace: Duration) -> Self {
        Self { profile, grace }
    }

    /// Run one hook to completion or timeout.
    ///
    /// Never returns an error: every failure mode (spawn failure, non-zero
    /// exit, timeout) is folded into the outcome so the caller always has
    /// exactly one record to attach.
    pub async fn run(&self, spec: &HookSpec, clock: &impl Clock) -> HookOutcome {
        let started_at = clock.now();

        let mut command = tokio::process::Command::new(&self.profile.interpreter);
        command
            .args(&self.profile.args)
            .arg(&spec.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return HookOutcome {
                    command: spec.command.clone(),
                    stdout: String::new(),
                    stderr: format!("failed to spawn hook: {}", e),
                    exit_code: None,
                    timed_out: false,
                    started_at,
                    finished_at: clock.now(),
                };
            }
        };

        // Drain both pipes concurrently so a full pipe cannot stall the
        // child; on timeout the kill closes them and the readers finish
        // with the partial output.
        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        let (exit_code, timed_out) = match tokio::time::timeout(spec.timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                tracing::warn!(command = %spec.command, error = %e, "hook wait failed");
                (None, false)
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = tokio::time::timeout(self.grace, child.wait()).await;
                (None, true)
            }
        };

        let stdout = collect(stdout_task, self.grace).await;
        let stderr = collect(stderr_task, self.grace).await;

        HookOutcome {
            command: spec.command.clone(),
            stdout,
            stderr,
            exit_code,
            timed_out,
            started_at,
            finished_at: clock.now(),
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<tokio::task::JoinHandle<Vec<u8>>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pipe.map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    })
}

async fn collect(task: Option<tokio::task::JoinHandle<Vec<u8>>>, grace: Duration) -> String {
    let Some(task) = task else {
        return String::new();
    };
    match tokio::time::timeout(grace, task).await {
        Ok(Ok(mut buf)) => {
            buf.truncate(MAX_CAPTURE);
            String::from_utf8_lossy(&buf).into_owned()
        }
        _ => String::new(),
    }
}
