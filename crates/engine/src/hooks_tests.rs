// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::hooks::HookRunner;
use sk_core::config::ExecutionProfile;
use sk_core::{HookSpec, SystemClock};
use std::time::{Duration, Instant};

fn runner() -> HookRunner {
    HookRunner::new(ExecutionProfile::default(), Duration::from_secs(2))
}

#[tokio::test]
async fn hook_captures_stdout_and_exit_code() {
    let outcome = runner()
        .run(
            &HookSpec::new("echo hello", Duration::from_secs(5)),
            &SystemClock,
        )
        .await;

    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.stdout.trim(), "hello");
    assert!(!outcome.timed_out);
    assert!(outcome.succeeded());
    assert!(outcome.finished_at >= outcome.started_at);
}

#[tokio::test]
async fn hook_captures_stderr_and_nonzero_exit() {
    let outcome = runner()
        .run(
            &HookSpec::new("echo oops >&2; exit 3", Duration::from_secs(5)),
            &SystemClock,
        )
        .await;

    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.stderr.trim(), "oops");
    assert!(!outcome.succeeded());
}

#[tokio::test]
async fn hook_timeout_kills_and_keeps_partial_output() {
    let start = Instant::now();
    let outcome = runner()
        .run(
            &HookSpec::new("echo partial; sleep 30", Duration::from_millis(300)),
            &SystemClock,
        )
        .await;
    let elapsed = start.elapsed();

    assert!(outcome.timed_out);
    assert_eq!(outcome.exit_code, None);
    assert_eq!(outcome.stdout.trim(), "partial");
    assert!(!outcome.succeeded());
    // Bounded by timeout + grace, with slack for a loaded machine.
    assert!(elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn unspawnable_interpreter_is_reported_not_fatal() {
    let runner = HookRunner::new(
        ExecutionProfile {
            interpreter: "/nonexistent/interpreter".to_string(),
            args: vec![],
        },
        Duration::from_secs(1),
    );

    let outcome = runner
        .run(&HookSpec::new("true", Duration::from_secs(1)), &SystemClock)
        .await;

    assert_eq!(outcome.exit_code, None);
    assert!(!outcome.timed_out);
    assert!(outcome.stderr.contains("failed to spawn"));
}

#[tokio::test]
async fn custom_profile_is_honored() {
    // Run through `sh -c` explicitly spelled as a custom profile.
    let runner = HookRunner::new(
        ExecutionProfile {
            interpreter: "sh".to_string(),
            args: vec!["-c".to_string()],
        },
        Duration::from_secs(1),
    );

    let outcome = runner
        .run(
            &HookSpec::new("printf '%s' profile-ok", Duration::from_secs(5)),
            &SystemClock,
        )
        .await;

    assert_eq!(outcome.stdout, "profile-ok");
    assert!(outcome.succeeded());
}
