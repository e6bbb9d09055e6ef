// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading
//!
//! One TOML file (`sk.toml`) at the project root describes the supervised
//! studios, the control API endpoint, and the engine tunables that are
//! deployment-specific (poll interval, failure threshold, tick interval). Durations
//! use humantime form ("30s", "10m").

use crate::studio::{MachineType, StudioId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no [[studio]] entries configured")]
    NoStudios,
    #[error("duplicate studio: {0}")]
    DuplicateStudio(StudioId),
}

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    pub control: ControlSettings,
    #[serde(rename = "studio", default)]
    pub studios: Vec<StudioEntry>,
}

impl SkConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SkConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.studios.is_empty() {
            return Err(ConfigError::NoStudios);
        }
        let mut seen = HashSet::new();
        for entry in &self.studios {
            let id = entry.id();
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateStudio(id));
            }
        }
        Ok(())
    }

    /// Ids of all configured studios
    pub fn studio_ids(&self) -> Vec<StudioId> {
        self.studios.iter().map(|s| s.id()).collect()
    }
}

/// Engine tunables with documented defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How often each studio is polled
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Consecutive poll failures before the cached state degrades to error
    pub failure_threshold: u32,
    /// Trigger evaluator tick
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// How long a requested transition may take to confirm
    #[serde(with = "humantime_serde")]
    pub transition_timeout: Duration,
    /// Extra time allowed for a hook process to die after its timeout
    #[serde(with = "humantime_serde")]
    pub hook_grace: Duration,
    /// How hook command strings are executed
    pub hook_profile: ExecutionProfile,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            failure_threshold: 3,
            tick_interval: Duration::from_secs(15),
            transition_timeout: Duration::from_secs(600),
            hook_grace: Duration::from_secs(5),
            hook_profile: ExecutionProfile::default(),
        }
    }
}

/// Interpreter + argument prefix used to run hook commands
///
/// Decided by configuration, never by inspecting the command at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub interpreter: String,
    pub args: Vec<String>,
}

impl Default for ExecutionProfile {
    fn default() -> Self {
        Self {
            interpreter: "sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

/// Control API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Base URL of the lifecycle API
    pub base_url: String,
    /// Environment variable holding the API token, if any
    #[serde(default)]
    pub token_env: Option<String>,
    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// One supervised studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioEntry {
    pub name: String,
    pub teamspace: String,
    pub owner: String,
    /// Default machine type for start actions on this studio
    #[serde(default)]
    pub machine_type: MachineType,
}

impl StudioEntry {
    pub fn id(&self) -> StudioId {
        StudioId::new(&self.name, &self.teamspace, &self.owner)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
