// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::bus::EventPattern;
use super::log::*;
use crate::event::Event;
use crate::studio::{StudioId, StudioState};
use crate::trigger::TriggerId;
use chrono::{Duration, TimeZone, Utc};
use std::io::Write;

fn state_change(at: chrono::DateTime<chrono::Utc>) -> Event {
    Event::StudioStateChanged {
        studio: StudioId::new("ml-box", "research", "ada"),
        from: StudioState::Stopped,
        to: StudioState::Running,
        observed_at: at,
    }
}

fn spent(id: &str) -> Event {
    Event::TriggerSpent {
        id: TriggerId::new(id),
    }
}

fn base_time() -> chrono::DateTime<chrono::Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

#[test]
fn append_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(dir.path().join("events.log")).unwrap();

    let at = base_time();
    log.append(state_change(at), at).unwrap();
    log.append(spent("t1"), at + Duration::minutes(1)).unwrap();

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sequence, 1);
    assert_eq!(records[0].name, "studio:state");
    assert_eq!(records[1].sequence, 2);
    assert_eq!(records[1].name, "trigger:spent");
    assert!(records.iter().all(|r| r.verify()));
}

#[test]
fn sequence_continues_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");

    let at = base_time();
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(spent("t1"), at).unwrap();
    }

    let mut log = EventLog::open(&path).unwrap();
    assert_eq!(log.current_sequence(), 1);
    let record = log.append(spent("t2"), at).unwrap();
    assert_eq!(record.sequence, 2);
}

#[test]
fn query_by_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(dir.path().join("events.log")).unwrap();

    let at = base_time();
    log.append(state_change(at), at).unwrap();
    log.append(spent("t1"), at).unwrap();
    log.append(spent("t2"), at).unwrap();

    let trigger_events = log.query(&EventPattern::new("trigger:*")).unwrap();
    assert_eq!(trigger_events.len(), 2);

    let studio_events = log.query(&EventPattern::new("studio:state")).unwrap();
    assert_eq!(studio_events.len(), 1);
}

#[test]
fn since_filters_by_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(dir.path().join("events.log")).unwrap();

    let at = base_time();
    for i in 0..5 {
        log.append(spent(&format!("t{}", i)), at).unwrap();
    }

    let tail = log.since(3).unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].sequence, 4);
}

#[test]
fn between_filters_by_time_range() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = EventLog::open(dir.path().join("events.log")).unwrap();

    let at = base_time();
    log.append(spent("before"), at - Duration::hours(1)).unwrap();
    log.append(spent("inside"), at).unwrap();
    log.append(spent("after"), at + Duration::hours(1)).unwrap();

    let range = log.between(at, at + Duration::minutes(30)).unwrap();
    assert_eq!(range.len(), 1);
    assert_eq!(range[0].sequence, 2);
}

#[test]
fn corrupt_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");

    let at = base_time();
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(spent("t1"), at).unwrap();
    }
    // Simulate a torn write at the tail.
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"sequence\":2,\"truncated").unwrap();
    }
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(spent("t3"), at).unwrap();
    }

    let records = EventLog::read_path(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.verify()));
}

#[test]
fn tampered_payload_fails_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");

    let at = base_time();
    {
        let mut log = EventLog::open(&path).unwrap();
        log.append(spent("t1"), at).unwrap();
    }

    // Rewrite the line with a modified payload but the original checksum.
    let content = std::fs::read_to_string(&path).unwrap();
    let tampered = content.replace("\"t1\"", "\"t9\"");
    assert_ne!(content, tampered);
    std::fs::write(&path, tampered).unwrap();

    let records = EventLog::read_path(&path).unwrap();
    assert!(records.is_empty());
}
