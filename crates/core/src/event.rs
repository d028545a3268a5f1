// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem change events as delivered by the watcher.
//!
//! Events arrive in batches, one batch per watched root, each carrying the
//! watcher's opaque cursor token. A batch is the atomic unit of translation:
//! all sync jobs derived from it commit in one store transaction together
//! with the cursor update.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of filesystem entry an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsEntryKind {
    File,
    Dir,
}

impl FsEntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, FsEntryKind::Dir)
    }
}

/// A single raw change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEvent {
    /// Path relative to the watched root, POSIX-style separators.
    pub name: String,
    /// Whether the path currently exists on disk.
    pub exists: bool,
    /// Whether the path is freshly observed by the watcher.
    pub is_new: bool,
    pub kind: FsEntryKind,
    /// Inode number, stable per filesystem. Pairs deletes with creates
    /// for rename detection.
    pub ino: u64,
    /// SHA-1 of the current content, hex-encoded. Present for files that
    /// exist at notification time.
    pub content_sha1: Option<String>,
}

/// A batch of events for one watched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Absolute path of the watched directory the events are relative to.
    pub root: PathBuf,
    /// Cursor token to persist once the batch is committed. `None` for
    /// replay batches that carry no resumable position.
    pub clock: Option<String>,
    pub events: Vec<FsEvent>,
}

impl EventBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
