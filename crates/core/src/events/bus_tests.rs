// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::bus::*;
use crate::event::Event;
use crate::trigger::TriggerId;

fn fired_event() -> Event {
    Event::TriggerFired {
        id: TriggerId::new("t1"),
        studio: crate::studio::StudioId::new("ml-box", "research", "ada"),
        action: crate::trigger::TriggerAction::Start,
        at: chrono::Utc::now(),
    }
}

fn deleted_event() -> Event {
    Event::TriggerDeleted {
        id: TriggerId::new("t1"),
    }
}

#[test]
fn pattern_exact_match() {
    let p = EventPattern::new("trigger:fired");
    assert!(p.matches("trigger:fired"));
    assert!(!p.matches("trigger:deleted"));
    assert!(!p.matches("studio:state"));
}

#[test]
fn pattern_category_wildcard() {
    let p = EventPattern::new("trigger:*");
    assert!(p.matches("trigger:fired"));
    assert!(p.matches("trigger:deleted"));
    assert!(!p.matches("studio:state"));
}

#[test]
fn pattern_match_all() {
    let p = EventPattern::new("*");
    assert!(p.matches("trigger:fired"));
    assert!(p.matches("studio:state"));
}

#[test]
fn subscriber_receives_matching_events() {
    let bus = EventBus::new();
    let (_id, mut rx) = bus.subscribe(vec![EventPattern::new("trigger:fired")]);

    bus.publish(&fired_event());
    bus.publish(&deleted_event());

    let received = rx.try_recv().unwrap();
    assert_eq!(received.name(), "trigger:fired");
    assert!(rx.try_recv().is_err()); // deleted did not match
}

#[test]
fn multiple_subscribers_all_receive() {
    let bus = EventBus::new();
    let (_a, mut rx_a) = bus.subscribe(vec![EventPattern::new("*")]);
    let (_b, mut rx_b) = bus.subscribe(vec![EventPattern::new("trigger:*")]);

    bus.publish(&fired_event());

    assert!(rx_a.try_recv().is_ok());
    assert!(rx_b.try_recv().is_ok());
}

#[test]
fn unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let (id, mut rx) = bus.subscribe(vec![EventPattern::new("*")]);
    bus.unsubscribe(id);

    bus.publish(&fired_event());
    assert!(rx.try_recv().is_err());
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn dropped_receiver_is_pruned_on_publish() {
    let bus = EventBus::new();
    let (_id, rx) = bus.subscribe(vec![EventPattern::new("*")]);
    drop(rx);

    bus.publish(&fired_event());
    assert_eq!(bus.subscriber_count(), 0);
}
