// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event log
//!
//! Durable audit trail of state changes and trigger executions. One JSON
//! document per line; each line carries a CRC32 checksum of its event so a
//! torn write is detected on read instead of corrupting the whole log.

use crate::event::Event;
use crate::events::bus::EventPattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from event log operations
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A logged event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number
    pub sequence: u64,
    /// When the event was appended
    pub at: DateTime<Utc>,
    /// The event name (for pattern queries without full deserialization)
    pub name: String,
    /// CRC32 of the serialized event payload
    pub checksum: u32,
    /// The full event data
    pub event: Event,
}

impl EventRecord {
    fn checksum_of(event: &Event) -> Result<u32, EventLogError> {
        let json = serde_json::to_string(event)?;
        Ok(crc32fast::hash(json.as_bytes()))
    }

    /// Verify the checksum matches the event payload
    pub fn verify(&self) -> bool {
        Self::checksum_of(&self.event).map(|c| c == self.checksum).unwrap_or(false)
    }
}

/// Append-only event log backed by a JSONL file
pub struct EventLog {
    path: PathBuf,
    file: File,
    sequence: u64,
}

impl EventLog {
    /// Open or create an event log at the given path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EventLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        // Count existing entries to continue the sequence
        let sequence = BufReader::new(File::open(&path)?).lines().count() as u64;

        Ok(Self {
            path,
            file,
            sequence,
        })
    }

    /// Append an event, durable before returning
    pub fn append(&mut self, event: Event, at: DateTime<Utc>) -> Result<EventRecord, EventLogError> {
        self.sequence += 1;

        let record = EventRecord {
            sequence: self.sequence,
            at,
            name: event.name().to_string(),
            checksum: EventRecord::checksum_of(&event)?,
            event,
        };

        let json = serde_json::to_string(&record)?;
        writeln!(self.file, "{}", json)?;
        self.file.sync_data()?;

        Ok(record)
    }

    /// Read all valid records from the log.
    ///
    /// Lines that fail to parse or whose checksum does not match are
    /// skipped with a warning; a torn tail write must not hide the rest of
    /// the trail.
    pub fn read_all(&self) -> Result<Vec<EventRecord>, EventLogError> {
        Self::read_path(&self.path)
    }

    /// Read all valid records from a log file without opening it for append
    pub fn read_path(path: &Path) -> Result<Vec<EventRecord>, EventLogError> {
        if !path.exists() {
            return Ok(vec![]);
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(&line) {
                Ok(record) if record.verify() => records.push(record),
                Ok(record) => {
                    tracing::warn!(
                        sequence = record.sequence,
                        line = line_no + 1,
                        "event log checksum mismatch, skipping entry"
                    );
                }
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "unreadable event log entry, skipping");
                }
            }
        }

        Ok(records)
    }

    /// Query events by name pattern
    pub fn query(&self, pattern: &EventPattern) -> Result<Vec<EventRecord>, EventLogError> {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(|r| pattern.matches(&r.name)).collect())
    }

    /// Query events after a sequence number
    pub fn since(&self, sequence: u64) -> Result<Vec<EventRecord>, EventLogError> {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(|r| r.sequence > sequence).collect())
    }

    /// Query events within a time range (inclusive start, exclusive end)
    pub fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, EventLogError> {
        let all = self.read_all()?;
        Ok(all
            .into_iter()
            .filter(|r| r.at >= from && r.at < to)
            .collect())
    }

    /// Get current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }
}
