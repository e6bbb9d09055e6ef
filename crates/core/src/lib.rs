//! sk-core: Core library for the Studio Keeper (sk) tool
//!
//! This crate provides:
//! - Pure state machines for studios and triggers
//! - Recurrence math for time-based firing
//! - Effect-based orchestration and the event model
//! - The append-only event log and in-process event bus
//! - Configuration loading

pub mod clock;
pub mod id;

pub mod config;
pub mod events;

// State machines (order matters for dependencies)
pub mod studio;
pub mod recurrence;
pub mod trigger;
pub mod record;
pub mod effect;
pub mod event;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, ControlSettings, EngineSettings, ExecutionProfile, SkConfig};
pub use effect::Effect;
pub use event::Event;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use record::{classify_outcome, ExecutionRecord, HookOutcome, Outcome};
pub use recurrence::Recurrence;
pub use studio::{MachineType, PollOutcome, Studio, StudioId, StudioState};
pub use trigger::{
    HookSpec, Trigger, TriggerAction, TriggerConfig, TriggerId, TriggerStatus, ValidationError,
};

pub use events::{EventBus, EventLog, EventLogError, EventPattern, EventRecord};
