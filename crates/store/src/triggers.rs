// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable trigger store
//!
//! One JSON document per trigger. Writes are serialized per trigger id and
//! bump the document version; an update against a stale version is
//! rejected. Reads never take a write lock: atomic replace guarantees they
//! see a complete document.

use crate::atomic::write_json;
use crate::StoreError;
use sk_core::{Trigger, TriggerId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Durable, versioned trigger persistence
#[derive(Clone)]
pub struct TriggerStore {
    dir: PathBuf,
    /// Per-id write locks; cross-trigger writes proceed in parallel
    locks: Arc<Mutex<HashMap<TriggerId, Arc<Mutex<()>>>>>,
}

impl TriggerStore {
    /// Open a store rooted at the given directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn path_for(&self, id: &TriggerId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn lock_for(&self, id: &TriggerId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Create a new trigger document; durable before returning
    pub fn create(&self, trigger: &Trigger) -> Result<Trigger, StoreError> {
        let lock = self.lock_for(&trigger.id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut stored = trigger.clone();
        stored.version = 1;
        write_json(&self.path_for(&trigger.id), &stored)?;
        Ok(stored)
    }

    /// Read a trigger by id
    pub fn get(&self, id: &TriggerId) -> Result<Trigger, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Replace a trigger document, enforcing version continuity.
    ///
    /// The caller passes the trigger as it last read it; the write fails
    /// with `VersionConflict` when the stored version has moved on. On
    /// success the stored version is bumped and the updated document
    /// returned.
    pub fn update(&self, trigger: &Trigger) -> Result<Trigger, StoreError> {
        let lock = self.lock_for(&trigger.id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.get(&trigger.id)?;
        if current.version != trigger.version {
            return Err(StoreError::VersionConflict {
                id: trigger.id.clone(),
                expected: trigger.version,
                found: current.version,
            });
        }

        let mut stored = trigger.clone();
        stored.version = current.version + 1;
        write_json(&self.path_for(&trigger.id), &stored)?;
        Ok(stored)
    }

    /// Delete a trigger document.
    ///
    /// An execution already in flight for this trigger is not aborted; its
    /// record will reference an id that no longer resolves.
    pub fn delete(&self, id: &TriggerId) -> Result<(), StoreError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        fs::remove_file(&path)?;

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(id);
        Ok(())
    }

    /// List all triggers, optionally only enabled ones.
    ///
    /// Documents that fail to parse are skipped with a warning so one
    /// corrupt file cannot take down the whole schedule.
    pub fn list(&self, enabled_only: bool) -> Result<Vec<Trigger>, StoreError> {
        let mut triggers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match read_trigger(&path) {
                    Ok(trigger) => {
                        if !enabled_only || trigger.enabled {
                            triggers.push(trigger);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable trigger document");
                    }
                }
            }
        }
        // Stable order for callers and tests
        triggers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(triggers)
    }

    /// Whether a trigger document exists
    pub fn exists(&self, id: &TriggerId) -> bool {
        self.path_for(id).exists()
    }
}

fn read_trigger(path: &Path) -> Result<Trigger, StoreError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
