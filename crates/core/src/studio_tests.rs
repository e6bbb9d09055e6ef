// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn studio() -> Studio {
    Studio::new(StudioId::new("ml-box", "research", "ada"))
}

fn observed(state: StudioState) -> PollOutcome {
    PollOutcome::Observed(state)
}

fn failed(reason: &str) -> PollOutcome {
    PollOutcome::Failed {
        reason: reason.to_string(),
    }
}

#[test]
fn studio_id_round_trips_through_display() {
    let id = StudioId::new("ml-box", "research", "ada");
    assert_eq!(id.to_string(), "ada/research/ml-box");
    let parsed: StudioId = "ada/research/ml-box".parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn studio_id_rejects_malformed_strings() {
    assert!("just-a-name".parse::<StudioId>().is_err());
    assert!("a/b".parse::<StudioId>().is_err());
    assert!("//".parse::<StudioId>().is_err());
}

#[test]
fn new_studio_starts_unknown() {
    let s = studio();
    assert_eq!(s.state, StudioState::Unknown);
    assert!(s.observed_at.is_none());
    assert_eq!(s.consecutive_failures, 0);
}

#[test]
fn first_observation_emits_one_state_change() {
    let clock = FakeClock::new();
    let s = studio();

    let (s, effects) = s.observe(observed(StudioState::Running), 3, &clock);

    assert_eq!(s.state, StudioState::Running);
    assert_eq!(s.observed_at, Some(clock.now()));
    assert_eq!(
        effects
            .iter()
            .filter(|e| matches!(
                e,
                Effect::Emit(Event::StudioStateChanged { .. })
            ))
            .count(),
        1
    );
}

#[test]
fn repeated_observation_emits_nothing() {
    let clock = FakeClock::new();
    let s = studio();

    let (s, _) = s.observe(observed(StudioState::Running), 3, &clock);
    clock.advance(chrono::Duration::seconds(30));
    let (s, effects) = s.observe(observed(StudioState::Running), 3, &clock);

    assert!(effects.is_empty());
    // observed_at still advances so staleness is visible
    assert_eq!(s.observed_at, Some(clock.now()));
}

#[test]
fn poll_failures_below_threshold_leave_state_untouched() {
    let clock = FakeClock::new();
    let (s, _) = studio().observe(observed(StudioState::Running), 3, &clock);

    let (s, effects) = s.observe(failed("timeout"), 3, &clock);
    assert!(effects.is_empty());
    assert_eq!(s.state, StudioState::Running);
    assert_eq!(s.consecutive_failures, 1);

    let (s, effects) = s.observe(failed("timeout"), 3, &clock);
    assert!(effects.is_empty());
    assert_eq!(s.state, StudioState::Running);
    assert_eq!(s.consecutive_failures, 2);
}

#[test]
fn threshold_failure_degrades_to_error() {
    let clock = FakeClock::new();
    let (mut s, _) = studio().observe(observed(StudioState::Running), 3, &clock);

    for _ in 0..2 {
        let (next, _) = s.observe(failed("connection refused"), 3, &clock);
        s = next;
    }
    let (s, effects) = s.observe(failed("connection refused"), 3, &clock);

    assert_eq!(
        s.state,
        StudioState::Error {
            reason: "connection refused".to_string()
        }
    );
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit(Event::StudioDegraded { failures: 3, .. })
    )));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit(Event::StudioStateChanged { .. })
    )));
}

#[test]
fn degraded_studio_does_not_re_emit_on_further_failures() {
    let clock = FakeClock::new();
    let mut s = studio();
    for _ in 0..3 {
        let (next, _) = s.observe(failed("down"), 3, &clock);
        s = next;
    }
    assert!(matches!(s.state, StudioState::Error { .. }));

    let (s, effects) = s.observe(failed("down"), 3, &clock);
    assert!(effects.is_empty());
    assert_eq!(s.consecutive_failures, 4);
}

#[test]
fn successful_poll_resets_failure_counter() {
    let clock = FakeClock::new();
    let (s, _) = studio().observe(observed(StudioState::Running), 3, &clock);
    let (s, _) = s.observe(failed("blip"), 3, &clock);
    assert_eq!(s.consecutive_failures, 1);

    let (s, _) = s.observe(observed(StudioState::Running), 3, &clock);
    assert_eq!(s.consecutive_failures, 0);
}

#[test]
fn recovery_from_error_emits_state_change() {
    let clock = FakeClock::new();
    let mut s = studio();
    for _ in 0..3 {
        let (next, _) = s.observe(failed("down"), 3, &clock);
        s = next;
    }

    let (s, effects) = s.observe(observed(StudioState::Stopped), 3, &clock);
    assert_eq!(s.state, StudioState::Stopped);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit(Event::StudioStateChanged { .. })
    )));
}

#[test]
fn begin_transition_sets_pending_state() {
    let clock = FakeClock::new();
    let (s, _) = studio().observe(observed(StudioState::Stopped), 3, &clock);

    let (s, effects) = s.begin_transition(TriggerAction::Start, Some(MachineType::Gpu), &clock);

    assert_eq!(s.state, StudioState::Starting);
    assert_eq!(s.machine_type, MachineType::Gpu);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Emit(Event::TransitionRequested {
            action: TriggerAction::Start,
            ..
        })
    )));
}

#[test]
fn begin_transition_keeps_machine_type_when_unspecified() {
    let clock = FakeClock::new();
    let mut s = studio();
    s.machine_type = MachineType::GpuFast;

    let (s, _) = s.begin_transition(TriggerAction::Stop, None, &clock);
    assert_eq!(s.state, StudioState::Stopping);
    assert_eq!(s.machine_type, MachineType::GpuFast);
}
