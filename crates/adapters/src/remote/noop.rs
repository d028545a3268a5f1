// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op remote for when the drive client is disabled.

use super::{NodeOutcome, RelocateRequest, RemoteAdapter, RemoteChild, RemoteError};
use async_trait::async_trait;
use drift_core::NodeUid;
use std::path::Path;

/// Remote adapter that accepts everything and stores nothing.
///
/// Used in minimal deployments where the drive client integration is not
/// linked in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpRemote;

impl NoOpRemote {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteAdapter for NoOpRemote {
    async fn my_files_root(&self) -> Result<NodeUid, RemoteError> {
        Ok(NodeUid::new("noop"))
    }

    async fn list_children(&self, _folder: &NodeUid) -> Result<Vec<RemoteChild>, RemoteError> {
        Ok(Vec::new())
    }

    async fn create_folder(
        &self,
        _parent: &NodeUid,
        _name: &str,
    ) -> Result<NodeUid, RemoteError> {
        Ok(NodeUid::new("noop"))
    }

    async fn upload_file(
        &self,
        _parent: &NodeUid,
        _name: &str,
        _local_path: &Path,
    ) -> Result<NodeUid, RemoteError> {
        Ok(NodeUid::new("noop"))
    }

    async fn upload_revision(
        &self,
        _node: &NodeUid,
        _local_path: &Path,
    ) -> Result<NodeUid, RemoteError> {
        Ok(NodeUid::new("noop"))
    }

    async fn trash_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError> {
        Ok(uids.iter().map(|_| NodeOutcome::AlreadyAbsent).collect())
    }

    async fn delete_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError> {
        Ok(uids.iter().map(|_| NodeOutcome::AlreadyAbsent).collect())
    }

    async fn relocate_node(
        &self,
        _uid: &NodeUid,
        _request: &RelocateRequest,
    ) -> Result<(), RemoteError> {
        Ok(())
    }
}
