// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote drive client adapter.
//!
//! The engine only needs a narrow slice of the cloud API: node creation,
//! content upload, trash, and relocation. Authentication, crypto, and
//! chunked transfer live inside the implementation.

mod noop;

pub use noop::NoOpRemote;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemote, RemoteCall};

use async_trait::async_trait;
use drift_core::NodeUid;
use std::path::Path;
use thiserror::Error;

/// Error from a remote operation.
///
/// The message text is significant: the retry policy classifies failures
/// by substring (network markers, stale-node markers), so implementations
/// must pass the client's error text through unmodified.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Kind of remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChild {
    pub name: String,
    pub uid: NodeUid,
    pub kind: NodeKind,
}

/// Per-node outcome of a trash call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Done,
    /// The node was already gone. Treated as success by the executor.
    AlreadyAbsent,
    Failed(String),
}

/// Relocation parameters: either field may be omitted to keep the
/// current parent or name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocateRequest {
    pub new_parent_uid: Option<NodeUid>,
    pub new_name: Option<String>,
}

/// Adapter over the remote drive client.
#[async_trait]
pub trait RemoteAdapter: Clone + Send + Sync + 'static {
    /// Uid of the drive's root folder.
    async fn my_files_root(&self) -> Result<NodeUid, RemoteError>;

    /// List a folder's children.
    ///
    /// Implementations must drain the client's child iterator to
    /// exhaustion before returning, even when the caller only needs one
    /// entry — the remote-side listing cache is only marked complete once
    /// the iteration finishes.
    async fn list_children(&self, folder: &NodeUid) -> Result<Vec<RemoteChild>, RemoteError>;

    async fn create_folder(&self, parent: &NodeUid, name: &str)
        -> Result<NodeUid, RemoteError>;

    /// Upload a new file under `parent`. Returns the created node's uid.
    async fn upload_file(
        &self,
        parent: &NodeUid,
        name: &str,
        local_path: &Path,
    ) -> Result<NodeUid, RemoteError>;

    /// Upload a new revision of an existing file node. Returns the node
    /// uid (unchanged by revisions).
    async fn upload_revision(
        &self,
        node: &NodeUid,
        local_path: &Path,
    ) -> Result<NodeUid, RemoteError>;

    /// Move nodes to the remote trash. One outcome per requested uid.
    async fn trash_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError>;

    /// Permanently delete nodes, bypassing the trash. The engine only
    /// trashes; this exists for trash-management front-ends.
    async fn delete_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError>;

    /// Rename and/or reparent a node in place.
    async fn relocate_node(
        &self,
        uid: &NodeUid,
        request: &RelocateRequest,
    ) -> Result<(), RemoteError>;
}
