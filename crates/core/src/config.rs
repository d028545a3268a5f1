// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! The daemon parses `config.toml` into this structure; the engine only
//! ever sees the parsed form. Reloads are published as whole new values.

use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One watched directory and its remote placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDir {
    /// Absolute path of the local directory to mirror.
    pub local_root: PathBuf,
    /// Remote prefix the mirrored tree lives under. Empty means the
    /// drive root.
    #[serde(default)]
    pub remote_prefix: String,
}

impl SyncDir {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_prefix: String::new(),
        }
    }

    pub fn with_remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }
}

/// Parsed engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub sync_dirs: Vec<SyncDir>,
    /// Maximum number of jobs in flight against the remote.
    #[serde(default = "default_sync_concurrency")]
    pub sync_concurrency: usize,
    /// Executor tick interval in watch mode.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long shutdown waits for in-flight jobs before abandoning them.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_sync_concurrency() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_dirs: Vec::new(),
            sync_concurrency: default_sync_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// True when the local path equals or lies under any configured root.
    pub fn covers_local_path(&self, local_path: &str) -> bool {
        self.sync_dirs.iter().any(|dir| {
            let root = dir.local_root.to_string_lossy();
            let root = root.trim_end_matches('/');
            local_path == root || paths::is_strictly_under(root, local_path)
        })
    }

    /// Configured watch roots as mapped-path strings.
    pub fn watch_roots(&self) -> Vec<String> {
        self.sync_dirs
            .iter()
            .map(|d| d.local_root.to_string_lossy().trim_end_matches('/').to_string())
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
