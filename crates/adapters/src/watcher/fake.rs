// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake watcher for testing

use super::{WatcherAdapter, WatcherError};
use async_trait::async_trait;
use drift_core::{EventBatch, SyncDir};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded watcher operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherCall {
    Connect,
    Close,
    QueryAllChanges { roots: Vec<String> },
    Subscribe { roots: Vec<String> },
}

struct FakeWatcherState {
    connected: bool,
    scripted: Vec<EventBatch>,
    live_tx: Option<mpsc::Sender<EventBatch>>,
    calls: Vec<WatcherCall>,
}

/// Fake watcher with scripted replay batches and a live delivery handle.
#[derive(Clone)]
pub struct FakeWatcher {
    inner: Arc<Mutex<FakeWatcherState>>,
}

impl Default for FakeWatcher {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeWatcherState {
                connected: false,
                scripted: Vec::new(),
                live_tx: None,
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch for the next `query_all_changes` replay.
    pub fn script_batch(&self, batch: EventBatch) {
        self.inner.lock().scripted.push(batch);
    }

    /// Deliver a batch through the active subscription.
    pub async fn deliver(&self, batch: EventBatch) {
        let tx = self.inner.lock().live_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(batch).await;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    pub fn has_subscription(&self) -> bool {
        self.inner.lock().live_tx.is_some()
    }

    /// Get all recorded operations
    pub fn calls(&self) -> Vec<WatcherCall> {
        self.inner.lock().calls.clone()
    }
}

fn roots_of(dirs: &[SyncDir]) -> Vec<String> {
    dirs.iter()
        .map(|d| d.local_root.to_string_lossy().into_owned())
        .collect()
}

#[async_trait]
impl WatcherAdapter for FakeWatcher {
    async fn connect(&self) -> Result<(), WatcherError> {
        let mut state = self.inner.lock();
        state.connected = true;
        state.calls.push(WatcherCall::Connect);
        Ok(())
    }

    async fn close(&self) -> Result<(), WatcherError> {
        let mut state = self.inner.lock();
        state.connected = false;
        state.live_tx = None;
        state.calls.push(WatcherCall::Close);
        Ok(())
    }

    async fn query_all_changes(
        &self,
        dirs: &[SyncDir],
        tx: mpsc::Sender<EventBatch>,
    ) -> Result<u64, WatcherError> {
        let batches = {
            let mut state = self.inner.lock();
            if !state.connected {
                return Err(WatcherError::NotConnected);
            }
            state.calls.push(WatcherCall::QueryAllChanges {
                roots: roots_of(dirs),
            });
            std::mem::take(&mut state.scripted)
        };

        let mut total = 0;
        for batch in batches {
            total += batch.events.len() as u64;
            tx.send(batch)
                .await
                .map_err(|e| WatcherError::QueryFailed(e.to_string()))?;
        }
        Ok(total)
    }

    async fn subscribe(
        &self,
        dirs: &[SyncDir],
        tx: mpsc::Sender<EventBatch>,
    ) -> Result<(), WatcherError> {
        let mut state = self.inner.lock();
        if !state.connected {
            return Err(WatcherError::NotConnected);
        }
        state.calls.push(WatcherCall::Subscribe {
            roots: roots_of(dirs),
        });
        state.live_tx = Some(tx);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
