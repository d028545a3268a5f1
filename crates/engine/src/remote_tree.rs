// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote path resolution.
//!
//! Walks remote paths segment by segment from the drive root. Lookups go
//! through `list_children`, which the adapter contract requires to drain
//! the server-side iterator fully per call — returning early on a match
//! would leave the remote listing cache permanently incomplete.

use drift_adapters::{NodeKind, RemoteAdapter, RemoteChild, RemoteError};
use drift_core::{paths, NodeUid};

/// Path-level view over the remote adapter.
#[derive(Clone)]
pub struct RemoteTree<R: RemoteAdapter> {
    remote: R,
}

impl<R: RemoteAdapter> RemoteTree<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Find a child by name in a folder's fully-drained listing.
    pub async fn find_child(
        &self,
        folder: &NodeUid,
        name: &str,
    ) -> Result<Option<RemoteChild>, RemoteError> {
        let children = self.remote.list_children(folder).await?;
        Ok(children.into_iter().find(|c| c.name == name))
    }

    /// Resolve a remote path to a node without creating anything.
    pub async fn resolve(&self, remote_path: &str) -> Result<Option<RemoteChild>, RemoteError> {
        let root = self.remote.my_files_root().await?;
        let mut current = RemoteChild {
            name: String::new(),
            uid: root,
            kind: NodeKind::Folder,
        };
        for segment in segments(remote_path) {
            if current.kind != NodeKind::Folder {
                return Ok(None);
            }
            match self.find_child(&current.uid, segment).await? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Resolve a remote folder path, creating missing folders on demand.
    /// An empty path is the drive root.
    pub async fn ensure_folder(&self, remote_path: &str) -> Result<NodeUid, RemoteError> {
        let mut current = self.remote.my_files_root().await?;
        for segment in segments(remote_path) {
            current = match self.find_child(&current, segment).await? {
                Some(child) if child.kind == NodeKind::Folder => child.uid,
                Some(child) => {
                    return Err(RemoteError::new(format!(
                        "{} exists and is not a folder",
                        child.name
                    )))
                }
                None => self.remote.create_folder(&current, segment).await?,
            };
        }
        Ok(current)
    }
}

fn segments(remote_path: &str) -> impl Iterator<Item = &str> {
    paths::strip_remote_root(remote_path)
        .split('/')
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "remote_tree_tests.rs"]
mod tests;
