// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem watcher adapter.

mod noop;

pub use noop::NoOpWatcher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWatcher, WatcherCall};

use async_trait::async_trait;
use drift_core::{EventBatch, SyncDir};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from watcher operations
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("watcher not connected")]
    NotConnected,
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Adapter over the filesystem watcher service.
///
/// Batches are delivered through the provided channel; each batch carries
/// the cursor token the engine persists once the batch commits, so a
/// restart resumes from the last acknowledged event.
#[async_trait]
pub trait WatcherAdapter: Clone + Send + Sync + 'static {
    async fn connect(&self) -> Result<(), WatcherError>;

    async fn close(&self) -> Result<(), WatcherError>;

    /// One-shot replay of every pending change for the given directories.
    /// Returns the total number of events delivered.
    async fn query_all_changes(
        &self,
        dirs: &[SyncDir],
        tx: mpsc::Sender<EventBatch>,
    ) -> Result<u64, WatcherError>;

    /// Continuous mode: deliver batches for the given directories until
    /// the watcher is closed or the receiver is dropped.
    async fn subscribe(
        &self,
        dirs: &[SyncDir],
        tx: mpsc::Sender<EventBatch>,
    ) -> Result<(), WatcherError>;
}
