// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{StoreError, TriggerStore};
use chrono::NaiveTime;
use sk_core::{
    FakeClock, Recurrence, StudioId, Trigger, TriggerAction, TriggerConfig, TriggerId,
};

fn make_trigger(id: &str) -> Trigger {
    let clock = FakeClock::new();
    let config = TriggerConfig::new(
        format!("trigger {}", id),
        StudioId::new("ml-box", "research", "ada"),
        TriggerAction::Start,
        Recurrence::Daily {
            at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        },
    );
    Trigger::new(TriggerId::new(id), config, &clock)
}

#[test]
fn create_and_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    let created = store.create(&make_trigger("t1")).unwrap();
    assert_eq!(created.version, 1);

    let loaded = store.get(&TriggerId::new("t1")).unwrap();
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.name, "trigger t1");
    assert_eq!(loaded.version, 1);
}

#[test]
fn get_missing_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    assert!(matches!(
        store.get(&TriggerId::new("nope")),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn update_bumps_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    let mut trigger = store.create(&make_trigger("t1")).unwrap();
    trigger.enabled = false;
    let updated = store.update(&trigger).unwrap();

    assert_eq!(updated.version, 2);
    let loaded = store.get(&TriggerId::new("t1")).unwrap();
    assert!(!loaded.enabled);
    assert_eq!(loaded.version, 2);
}

#[test]
fn stale_update_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    let stale = store.create(&make_trigger("t1")).unwrap();
    let mut fresh = stale.clone();
    fresh.name = "renamed".to_string();
    store.update(&fresh).unwrap();

    // A second writer holding the old version must not clobber the rename.
    let result = store.update(&stale);
    assert!(matches!(
        result,
        Err(StoreError::VersionConflict {
            expected: 1,
            found: 2,
            ..
        })
    ));
    assert_eq!(store.get(&TriggerId::new("t1")).unwrap().name, "renamed");
}

#[test]
fn delete_removes_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    store.create(&make_trigger("t1")).unwrap();
    assert!(store.exists(&TriggerId::new("t1")));

    store.delete(&TriggerId::new("t1")).unwrap();
    assert!(!store.exists(&TriggerId::new("t1")));
    assert!(matches!(
        store.delete(&TriggerId::new("t1")),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn list_returns_sorted_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    store.create(&make_trigger("b")).unwrap();
    store.create(&make_trigger("a")).unwrap();
    store.create(&make_trigger("c")).unwrap();

    let all = store.list(false).unwrap();
    let ids: Vec<String> = all.iter().map(|t| t.id.0.clone()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn list_enabled_only_filters() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    store.create(&make_trigger("on")).unwrap();
    let mut off = make_trigger("off");
    off.enabled = false;
    store.create(&off).unwrap();

    let enabled = store.list(true).unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, TriggerId::new("on"));
}

#[test]
fn corrupt_document_is_skipped_on_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    store.create(&make_trigger("good")).unwrap();
    std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();

    let all = store.list(false).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, TriggerId::new("good"));
}

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = TriggerStore::open(dir.path()).unwrap();
        store.create(&make_trigger("t1")).unwrap();
    }

    let store = TriggerStore::open(dir.path()).unwrap();
    assert!(store.exists(&TriggerId::new("t1")));
    assert_eq!(store.list(false).unwrap().len(), 1);
}

#[test]
fn no_temp_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriggerStore::open(dir.path()).unwrap();

    let mut trigger = store.create(&make_trigger("t1")).unwrap();
    trigger.name = "renamed".to_string();
    store.update(&trigger).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
        .collect();
    assert!(leftovers.is_empty());
}
