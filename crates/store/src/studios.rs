// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted studio observations
//!
//! The live studio registry restarts as `Unknown`; this cache preserves the
//! last observation (state name, time, machine type) across restarts so
//! consumers can show continuity until the first poll lands.

use crate::atomic::write_json;
use crate::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sk_core::{MachineType, Studio, StudioId};
use std::fs;
use std::path::PathBuf;

/// Last persisted observation of one studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioObservation {
    pub id: StudioId,
    /// Name of the last observed state ("running", "error", ...)
    pub state: String,
    pub observed_at: Option<DateTime<Utc>>,
    pub machine_type: MachineType,
}

impl StudioObservation {
    pub fn of(studio: &Studio) -> Self {
        Self {
            id: studio.id.clone(),
            state: studio.state.name().to_string(),
            observed_at: studio.observed_at,
            machine_type: studio.machine_type,
        }
    }
}

/// Durable cache of studio observations
#[derive(Clone)]
pub struct StudioCache {
    dir: PathBuf,
}

impl StudioCache {
    /// Open a cache rooted at the given directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &StudioId) -> PathBuf {
        self.dir.join(format!("{}.json", id.key()))
    }

    /// Persist the current observation of a studio
    pub fn save(&self, studio: &Studio) -> Result<(), StoreError> {
        write_json(&self.path_for(&studio.id), &StudioObservation::of(studio))
    }

    /// Read the persisted observation for a studio, if any
    pub fn get(&self, id: &StudioId) -> Result<Option<StudioObservation>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Read all persisted observations.
    ///
    /// Unreadable documents are skipped with a warning.
    pub fn list(&self) -> Result<Vec<StudioObservation>, StoreError> {
        let mut observations = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|json| serde_json::from_str(&json).map_err(StoreError::from))
                {
                    Ok(obs) => observations.push(obs),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable studio document");
                    }
                }
            }
        }
        observations.sort_by(|a: &StudioObservation, b: &StudioObservation| a.id.cmp(&b.id));
        Ok(observations)
    }
}
