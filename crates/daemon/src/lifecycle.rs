// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use drift_core::{JobStatus, SyncConfig};
use drift_storage::{flags, jobs, Store, StoreError};
use fs2::FileExt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// Fixed file layout under the state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root state directory (e.g. ~/.local/state/drift)
    pub state_dir: PathBuf,
    /// SQLite database with all durable engine state
    pub db_path: PathBuf,
    /// User configuration file
    pub config_path: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    /// Daemon log file
    pub log_path: PathBuf,
}

impl Paths {
    /// Resolve paths for the user-level daemon.
    ///
    /// `DRIFT_STATE_DIR` takes priority (tests use it for isolation),
    /// then `$XDG_STATE_HOME/drift`, then `~/.local/state/drift`.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir_from_env(|name| std::env::var(name).ok())
            .ok_or(LifecycleError::NoStateDir)?;
        Ok(Self::in_state_dir(state_dir))
    }

    pub fn in_state_dir(state_dir: PathBuf) -> Self {
        Self {
            db_path: state_dir.join("sync.db"),
            config_path: state_dir.join("config.toml"),
            lock_path: state_dir.join("driftd.pid"),
            log_path: state_dir.join("driftd.log"),
            state_dir,
        }
    }
}

fn state_dir_from_env(get: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(dir) = get("DRIFT_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = get("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("drift"));
    }
    get("HOME").map(|home| PathBuf::from(home).join(".local/state/drift"))
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
#[derive(Debug)]
pub struct DaemonState {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub store: Store,
    config_tx: watch::Sender<SyncConfig>,
}

/// Start the daemon: lock, open the store, load configuration.
pub async fn startup(
    paths: &Paths,
) -> Result<(DaemonState, watch::Receiver<SyncConfig>), LifecycleError> {
    match startup_inner(paths).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The lock holder owns these files; only clean up our own mess
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(paths);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    paths: &Paths,
) -> Result<(DaemonState, watch::Receiver<SyncConfig>), LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;

    // Acquire the lock FIRST. Open without truncating so a failed attempt
    // cannot wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    let config = load_config(paths)?;
    info!(
        dirs = config.sync_dirs.len(),
        concurrency = config.sync_concurrency,
        "configuration loaded"
    );

    let store = Store::open(&paths.db_path).await?;

    {
        let mut conn = store.acquire().await?;
        flags::set(&mut conn, flags::RUNNING, Utc::now()).await?;
        let pending = jobs::count_by_status(&mut conn, JobStatus::Pending).await?;
        let blocked = jobs::count_by_status(&mut conn, JobStatus::Blocked).await?;
        info!(pending, blocked, "queue state at startup");
    }

    let (config_tx, config_rx) = watch::channel(config);

    info!("Daemon started");

    Ok((
        DaemonState {
            paths: paths.clone(),
            lock_file,
            store,
            config_tx,
        },
        config_rx,
    ))
}

/// Read `config.toml`, defaulting when the file does not exist yet.
pub fn load_config(paths: &Paths) -> Result<SyncConfig, LifecycleError> {
    let raw = match std::fs::read_to_string(&paths.config_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %paths.config_path.display(), "no config file, using defaults");
            return Ok(SyncConfig::default());
        }
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&raw).map_err(|e| LifecycleError::Config(e.to_string()))
}

/// Re-read the config file and publish it to the engine.
pub fn reload_config(
    paths: &Paths,
    config_tx: &watch::Sender<SyncConfig>,
) -> Result<(), LifecycleError> {
    let config = load_config(paths)?;
    info!(
        dirs = config.sync_dirs.len(),
        concurrency = config.sync_concurrency,
        "configuration reloaded"
    );
    // Send fails only when the engine is gone; reload is moot then
    let _ = config_tx.send(config);
    Ok(())
}

impl DaemonState {
    /// Handle for publishing config updates to the engine.
    pub fn config_sender(&self) -> watch::Sender<SyncConfig> {
        self.config_tx.clone()
    }

    /// Shutdown the daemon gracefully.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        {
            let mut conn = self.store.acquire().await?;
            flags::clear(&mut conn, flags::RUNNING).await?;
        }
        self.store.close().await;

        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        // Lock is released when self.lock_file drops

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths) {
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
