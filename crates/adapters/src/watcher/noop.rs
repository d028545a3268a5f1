// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op watcher for when filesystem watching is disabled.

use super::{WatcherAdapter, WatcherError};
use async_trait::async_trait;
use drift_core::{EventBatch, SyncDir};
use tokio::sync::mpsc;

/// Watcher that never reports changes.
///
/// Used in minimal deployments where the watcher service integration is
/// not linked in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpWatcher;

impl NoOpWatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WatcherAdapter for NoOpWatcher {
    async fn connect(&self) -> Result<(), WatcherError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), WatcherError> {
        Ok(())
    }

    async fn query_all_changes(
        &self,
        _dirs: &[SyncDir],
        _tx: mpsc::Sender<EventBatch>,
    ) -> Result<u64, WatcherError> {
        Ok(0)
    }

    async fn subscribe(
        &self,
        _dirs: &[SyncDir],
        _tx: mpsc::Sender<EventBatch>,
    ) -> Result<(), WatcherError> {
        Ok(())
    }
}
