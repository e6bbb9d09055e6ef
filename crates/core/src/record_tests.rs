// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn hook(exit_code: Option<i32>, timed_out: bool) -> HookOutcome {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    HookOutcome {
        command: "sync.sh".to_string(),
        stdout: String::new(),
        stderr: String::new(),
        exit_code,
        timed_out,
        started_at: at,
        finished_at: at,
    }
}

#[parameterized(
    clean_run = { true, None, Outcome::Success },
    clean_run_with_hook = { true, Some((Some(0), false)), Outcome::Success },
    hook_nonzero_exit = { true, Some((Some(2), false)), Outcome::PartialFailure },
    hook_timed_out = { true, Some((None, true)), Outcome::PartialFailure },
    transition_failed = { false, None, Outcome::Failure },
    transition_failed_trumps_hook = { false, Some((Some(0), false)), Outcome::Failure },
)]
fn outcome_classification(
    transition_ok: bool,
    hook_result: Option<(Option<i32>, bool)>,
    expected: Outcome,
) {
    let hook_outcome = hook_result.map(|(code, timed_out)| hook(code, timed_out));
    assert_eq!(
        classify_outcome(transition_ok, hook_outcome.as_ref()),
        expected
    );
}

#[test]
fn hook_succeeded_requires_zero_exit_and_no_timeout() {
    assert!(hook(Some(0), false).succeeded());
    assert!(!hook(Some(1), false).succeeded());
    assert!(!hook(None, true).succeeded());
    // Killed at timeout but somehow reported zero: still a timeout.
    assert!(!hook(Some(0), true).succeeded());
}

#[test]
fn record_serde_round_trip() {
    let record = ExecutionRecord {
        trigger_id: TriggerId::new("t1"),
        trigger_name: "nightly stop".to_string(),
        studio: StudioId::new("ml-box", "research", "ada"),
        action: TriggerAction::Stop,
        fired_at: Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap(),
        hook: Some(hook(Some(0), false)),
        outcome: Outcome::Success,
        error: None,
        duration_ms: 4_200,
    };

    let json = serde_json::to_string(&record).unwrap();
    let back: ExecutionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}
