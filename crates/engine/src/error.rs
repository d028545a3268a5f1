// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine errors

use drift_adapters::WatcherError;
use drift_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine to its caller.
///
/// Per-job remote failures never appear here; they are classified and fed
/// back into the queue. What does surface is infrastructure the engine
/// cannot work without: the store and the watcher.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),
}
