// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.
//!
//! Startup ordering matters: the lock is taken first, configuration and
//! stores load before anything network-facing exists, the trigger reload
//! and catch-up pass run before the evaluator's first tick, and the socket
//! binds last so clients can never reach a half-initialized daemon.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use fs2::FileExt;
use sha2::{Digest, Sha256};
use sk_control::{HttpControlClient, TracedControlClient};
use sk_core::{ConfigError, EventLog, EventLogError, SkConfig, SystemClock, UuidIdGen};
use sk_engine::{Runtime, RuntimeDeps};
use sk_store::{StoreError, StudioCache, TriggerStore};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Daemon runtime with concrete adapter types (wrapped with tracing)
pub type DaemonRuntime = Runtime<TracedControlClient<HttpControlClient>, SystemClock, UuidIdGen>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory (where sk.toml lives)
    pub project_root: PathBuf,
    /// Path to the sk.toml configuration file
    pub config_path: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Trigger store directory
    pub triggers_path: PathBuf,
    /// Studio cache directory
    pub studios_path: PathBuf,
    /// Event log file
    pub events_path: PathBuf,
}

impl Config {
    /// Create config for a project
    pub fn for_project(project_root: &Path) -> Result<Self, LifecycleError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| LifecycleError::ProjectNotFound(project_root.to_path_buf(), e))?;

        let hash = project_hash(&canonical);
        let state_dir = state_dir()?.join("projects").join(&hash);
        let socket_dir = socket_dir()?;

        Ok(Self {
            config_path: canonical.join("sk.toml"),
            project_root: canonical,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            triggers_path: state_dir.join("triggers"),
            studios_path: state_dir.join("studios"),
            events_path: state_dir.join("events.log"),
        })
    }
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// The scheduling engine
    pub runtime: DaemonRuntime,
    /// Engine loops (pollers, evaluator, dispatcher)
    engine_tasks: Vec<JoinHandle<()>>,
    /// When daemon started
    pub start_time: Instant,
    /// Shutdown requested flag
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop the engine loops; in-flight remote calls are abandoned,
        //    the next startup reconciles by polling.
        for task in self.engine_tasks.drain(..) {
            task.abort();
        }

        // 2. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 3. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Remove version file
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        // 5. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Project not found at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directories (needed for socket, lock, etc.)
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // Write version file
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Load configuration BEFORE binding socket (fail fast, don't accept
    //    connections with an invalid config)
    let sk_config = SkConfig::load(&config.config_path)?;
    info!(
        studios = sk_config.studios.len(),
        "Loaded configuration from {}",
        config.config_path.display()
    );

    // 4. Open stores; trigger reload is mandatory before the first tick
    let triggers = TriggerStore::open(&config.triggers_path)?;
    let studios = StudioCache::open(&config.studios_path)?;
    let log = Arc::new(Mutex::new(EventLog::open(&config.events_path)?));

    let known = triggers.list(false)?;
    info!(
        triggers = known.len(),
        cached_studios = studios.list().map(|s| s.len()).unwrap_or(0),
        "Reloaded persisted state"
    );

    // 5. Control client, with the credential from the configured env var
    let token = sk_config
        .control
        .token_env
        .as_ref()
        .and_then(|var| std::env::var(var).ok());
    if sk_config.control.token_env.is_some() && token.is_none() {
        warn!("control token env var is set in config but empty in the environment");
    }
    let control = TracedControlClient::new(HttpControlClient::new(
        &sk_config.control.base_url,
        token,
        sk_config.control.request_timeout,
    ));

    // 6. Assemble the engine
    let mut runtime = Runtime::new(
        RuntimeDeps {
            control,
            clock: SystemClock,
            id_gen: UuidIdGen,
            triggers,
            studios,
            log,
        },
        sk_config.engine.clone(),
        &sk_config.studios,
    );

    // 7. Catch-up pass: triggers that came due during downtime fire once,
    //    before the first regular tick and before clients can connect.
    runtime.catch_up();

    // 8. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 9. Spawn the engine loops
    let engine_tasks = runtime.start();

    info!(
        "Daemon started for project: {}",
        config.project_root.display()
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        runtime,
        engine_tasks,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for sk
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("sk"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/sk"))
}

/// Get the socket directory for sk
///
/// Uses /tmp/sk by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with SK_SOCKET_DIR for testing.
fn socket_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SK_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/sk"))
}

/// Compute project hash for unique daemon directory
fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    result[..8].iter().map(|b| format!("{:02x}", b)).collect()
}
