// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::events::EventSink;
use crate::monitor::{MonitorError, StateMonitor, TransitionStatus};
use sk_control::{ControlError, FakeControlClient, RemoteStatus};
use sk_core::events::EventReceiver;
use sk_core::{
    Event, EventBus, EventLog, EventPattern, FakeClock, MachineType, StudioId, StudioState,
    TriggerAction,
};
use sk_store::StudioCache;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Fixture {
    _dir: tempfile::TempDir,
    control: FakeControlClient,
    clock: FakeClock,
    events: EventReceiver,
    monitor: StateMonitor<FakeControlClient, FakeClock>,
}

fn studio_id() -> StudioId {
    StudioId::new("ml-box", "research", "ada")
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let bus = EventBus::new();
    let (_, events) = bus.subscribe(vec![EventPattern::new("*")]);
    let log = Arc::new(Mutex::new(
        EventLog::open(dir.path().join("events.log")).unwrap(),
    ));
    let sink = EventSink::new(bus, log);
    let cache = StudioCache::open(dir.path().join("studios")).unwrap();
    let control = FakeControlClient::new();
    let clock = FakeClock::new();

    let monitor = StateMonitor::new(
        control.clone(),
        clock.clone(),
        sink,
        cache,
        Duration::from_secs(30),
        3,
        Duration::from_secs(600),
    );
    monitor.register(studio_id(), MachineType::Cpu);

    Fixture {
        _dir: dir,
        control,
        clock,
        events,
        monitor,
    }
}

fn drain(rx: &mut EventReceiver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn poll_caches_state_and_emits_once_per_transition() {
    let mut fx = fixture();
    let id = studio_id();
    fx.control.push_poll_n(&id, Ok(RemoteStatus::Running), 4);

    for _ in 0..4 {
        fx.monitor.poll_once(&id).await.unwrap();
    }

    let (state, observed_at) = fx.monitor.current(&id).unwrap();
    assert_eq!(state, StudioState::Running);
    assert!(observed_at.is_some());

    let changes = drain(&mut fx.events)
        .into_iter()
        .filter(|e| matches!(e, Event::StudioStateChanged { .. }))
        .count();
    assert_eq!(changes, 1);
}

#[tokio::test]
async fn unregistered_studio_is_rejected() {
    let fx = fixture();
    let unknown = StudioId::new("ghost", "research", "ada");
    assert!(matches!(
        fx.monitor.poll_once(&unknown).await,
        Err(MonitorError::NotRegistered(_))
    ));
}

#[tokio::test]
async fn transient_failures_degrade_only_at_threshold() {
    let mut fx = fixture();
    let id = studio_id();
    fx.control.push_poll(&id, Ok(RemoteStatus::Running));
    fx.control.push_poll_n(
        &id,
        Err(ControlError::Transient {
            message: "connection refused".to_string(),
        }),
        3,
    );

    fx.monitor.poll_once(&id).await.unwrap();
    drain(&mut fx.events);

    // Failures one and two: cached state untouched, nothing emitted.
    for _ in 0..2 {
        fx.monitor.poll_once(&id).await.unwrap();
        let (state, _) = fx.monitor.current(&id).unwrap();
        assert_eq!(state, StudioState::Running);
        assert!(drain(&mut fx.events).is_empty());
    }

    // Third consecutive failure crosses the threshold.
    fx.monitor.poll_once(&id).await.unwrap();
    let (state, _) = fx.monitor.current(&id).unwrap();
    assert!(matches!(state, StudioState::Error { .. }));
    let events = drain(&mut fx.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::StudioDegraded { failures: 3, .. })));
}

#[tokio::test]
async fn terminal_poll_error_degrades_immediately() {
    let mut fx = fixture();
    let id = studio_id();
    fx.control.push_poll(
        &id,
        Err(ControlError::Auth {
            message: "bad token".to_string(),
        }),
    );

    fx.monitor.poll_once(&id).await.unwrap();

    let (state, _) = fx.monitor.current(&id).unwrap();
    assert!(matches!(state, StudioState::Error { .. }));
    let changes = drain(&mut fx.events)
        .into_iter()
        .filter(|e| matches!(e, Event::StudioStateChanged { .. }))
        .count();
    assert_eq!(changes, 1);
}

#[tokio::test]
async fn request_transition_sets_pending_state() {
    let mut fx = fixture();
    let id = studio_id();

    let handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, Some(MachineType::Gpu))
        .await
        .unwrap();

    assert_eq!(handle.status(), TransitionStatus::Pending);
    let (state, _) = fx.monitor.current(&id).unwrap();
    assert_eq!(state, StudioState::Starting);

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::TransitionRequested {
            action: TriggerAction::Start,
            ..
        }
    )));
}

#[tokio::test]
async fn second_transition_request_conflicts_and_leaves_cache_alone() {
    let fx = fixture();
    let id = studio_id();

    let _handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await
        .unwrap();
    let (state_before, _) = fx.monitor.current(&id).unwrap();

    let second = fx
        .monitor
        .request_transition(&id, TriggerAction::Stop, None)
        .await;
    assert!(matches!(second, Err(MonitorError::Conflict { .. })));

    let (state_after, _) = fx.monitor.current(&id).unwrap();
    assert_eq!(state_after, state_before);

    // The rejected request never reached the remote API.
    let stops = fx
        .control
        .call_count(|c| matches!(c, sk_control::ControlCall::Stop(_)));
    assert_eq!(stops, 0);
}

#[tokio::test]
async fn rejected_remote_call_frees_the_slot_and_cache() {
    let fx = fixture();
    let id = studio_id();
    fx.control.push_poll(&id, Ok(RemoteStatus::Stopped));
    fx.monitor.poll_once(&id).await.unwrap();

    fx.control.fail_start(ControlError::Terminal {
        message: "quota exceeded".to_string(),
    });
    let result = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await;
    assert!(matches!(result, Err(MonitorError::Control(_))));

    // Cache untouched and no in-flight slot left behind.
    let (state, _) = fx.monitor.current(&id).unwrap();
    assert_eq!(state, StudioState::Stopped);
    assert!(!fx.monitor.cancel_transition(&id));
}

#[tokio::test]
async fn poll_confirming_target_state_resolves_handle() {
    let mut fx = fixture();
    let id = studio_id();

    let mut handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await
        .unwrap();

    fx.control.push_poll(&id, Ok(RemoteStatus::Running));
    fx.monitor.poll_once(&id).await.unwrap();

    assert_eq!(handle.wait().await, TransitionStatus::Completed);
    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::TransitionCompleted {
            action: TriggerAction::Start,
            ..
        }
    )));

    // Slot is free again.
    let again = fx
        .monitor
        .request_transition(&id, TriggerAction::Stop, None)
        .await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn deadline_expiry_resolves_timeout_and_degrades() {
    let mut fx = fixture();
    let id = studio_id();

    let mut handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await
        .unwrap();

    // Remote stays pending past the deadline.
    fx.control.push_poll_n(&id, Ok(RemoteStatus::Pending), 2);
    fx.clock.advance(chrono::Duration::seconds(601));
    fx.monitor.poll_once(&id).await.unwrap();

    assert_eq!(handle.wait().await, TransitionStatus::TimedOut);
    let (state, _) = fx.monitor.current(&id).unwrap();
    assert!(matches!(state, StudioState::Error { .. }));
    let events = drain(&mut fx.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::TransitionTimedOut { .. })));
}

#[tokio::test]
async fn cancel_frees_slot_without_undoing_remote_call() {
    let fx = fixture();
    let id = studio_id();

    let handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await
        .unwrap();

    assert!(fx.monitor.cancel_transition(&id));
    assert_eq!(handle.status(), TransitionStatus::Cancelled);

    // The start call went out and stays out.
    let starts = fx
        .control
        .call_count(|c| matches!(c, sk_control::ControlCall::Start(_, _)));
    assert_eq!(starts, 1);

    // Slot is free for the next request.
    assert!(fx
        .monitor
        .request_transition(&id, TriggerAction::Stop, None)
        .await
        .is_ok());
}

#[tokio::test]
async fn handle_cancel_resolves_waiters() {
    let fx = fixture();
    let id = studio_id();

    let handle = fx
        .monitor
        .request_transition(&id, TriggerAction::Start, None)
        .await
        .unwrap();

    assert_eq!(handle.cancel(), TransitionStatus::Cancelled);
    assert!(!fx.monitor.cancel_transition(&id)); // already resolved
}
