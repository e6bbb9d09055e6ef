// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the CLI and the daemon
//!
//! Length-prefixed JSON frames over a Unix socket: a u32 big-endian length
//! followed by that many bytes of JSON. One request, one response per
//! connection.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sk_core::{
    EventRecord, MachineType, Recurrence, Studio, Trigger, TriggerAction, TriggerConfig,
};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version exchanged in the Hello handshake
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for reading or writing one frame
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on one frame; anything larger is a protocol violation
const MAX_FRAME_SIZE: u32 = 4 * 1024 * 1024;

/// Errors in protocol framing
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out")]
    Timeout,
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Requests the CLI can make
#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    Ping,
    Hello { version: String },
    Status,
    Shutdown,
    TriggerCreate { config: TriggerConfig },
    TriggerEnable { id: String, enabled: bool },
    TriggerReschedule { id: String, recurrence: Recurrence },
    TriggerDelete { id: String },
    Transition {
        studio: String,
        action: TriggerAction,
        machine_type: Option<MachineType>,
    },
    TransitionCancel { studio: String },
    Query { query: Query },
}

/// Read-only queries
#[derive(Debug, Serialize, Deserialize)]
pub enum Query {
    ListTriggers { enabled_only: bool },
    GetTrigger { id: String },
    ListStudios,
    GetStudio { id: String },
    EventsSince { sequence: u64 },
    EventsMatching { pattern: String },
}

/// Responses from the daemon
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Pong,
    Hello { version: String },
    Ok,
    ShuttingDown,
    Status {
        uptime_secs: u64,
        studios: usize,
        triggers_active: usize,
    },
    Trigger { trigger: Box<TriggerSummary> },
    Triggers { triggers: Vec<TriggerSummary> },
    Studio { studio: Option<StudioSummary> },
    Studios { studios: Vec<StudioSummary> },
    /// Pending state right after a transition request was accepted
    Transition { state: String },
    Cancelled { cancelled: bool },
    Events { events: Vec<EventRecord> },
    Error { message: String },
}

/// Trigger as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSummary {
    pub id: String,
    pub name: String,
    pub studio: String,
    pub action: TriggerAction,
    pub recurrence: Recurrence,
    pub machine_type: MachineType,
    pub enabled: bool,
    pub status: String,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub next_fire_at: Option<DateTime<Utc>>,
}

impl TriggerSummary {
    pub fn of(trigger: &Trigger) -> Self {
        Self {
            id: trigger.id.to_string(),
            name: trigger.name.clone(),
            studio: trigger.studio.to_string(),
            action: trigger.action,
            recurrence: trigger.recurrence.clone(),
            machine_type: trigger.machine_type,
            enabled: trigger.enabled,
            status: trigger.status.to_string(),
            last_fired_at: trigger.last_fired_at,
            next_fire_at: trigger.next_fire_at,
        }
    }
}

/// Studio as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSummary {
    pub id: String,
    pub state: String,
    pub observed_at: Option<DateTime<Utc>>,
    pub machine_type: MachineType,
}

impl StudioSummary {
    pub fn of(studio: &Studio) -> Self {
        Self {
            id: studio.id.to_string(),
            state: studio.state.to_string(),
            observed_at: studio.observed_at,
            machine_type: studio.machine_type,
        }
    }
}

/// Serialize a message to a JSON frame body
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a frame body
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    writer.write_u32(data.len() as u32).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read and decode one request, bounded by a timeout
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write one response, bounded by a timeout
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
