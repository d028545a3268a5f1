// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake remote drive for testing.
//!
//! Keeps an in-memory node tree and records every call. Failures are
//! scripted per operation as a FIFO of error messages, so tests can make
//! the n-th call fail with a chosen (classifiable) message. Re-uploading
//! an existing name bumps the node's revision instead of erroring, which
//! is what keeps retried jobs idempotent against the real service.

use super::{
    NodeKind, NodeOutcome, RelocateRequest, RemoteAdapter, RemoteChild, RemoteError,
};
use async_trait::async_trait;
use drift_core::NodeUid;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

const ROOT_UID: &str = "n-root";

/// Recorded remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    MyFilesRoot,
    ListChildren { folder: NodeUid },
    CreateFolder { parent: NodeUid, name: String },
    UploadFile { parent: NodeUid, name: String },
    UploadRevision { node: NodeUid },
    TrashNodes { uids: Vec<NodeUid> },
    DeleteNodes { uids: Vec<NodeUid> },
    Relocate { uid: NodeUid, request: RelocateRequest },
}

#[derive(Debug, Clone)]
struct FakeNode {
    name: String,
    parent: Option<NodeUid>,
    kind: NodeKind,
    revision: u32,
}

struct FakeRemoteState {
    nodes: HashMap<NodeUid, FakeNode>,
    next_uid: u64,
    failures: HashMap<String, VecDeque<String>>,
    calls: Vec<RemoteCall>,
}

impl FakeRemoteState {
    fn fresh_uid(&mut self) -> NodeUid {
        self.next_uid += 1;
        NodeUid::new(format!("n-{}", self.next_uid))
    }

    fn take_failure(&mut self, op: &str) -> Result<(), RemoteError> {
        if let Some(queue) = self.failures.get_mut(op) {
            if let Some(message) = queue.pop_front() {
                return Err(RemoteError::new(message));
            }
        }
        Ok(())
    }

    fn require_folder(&self, uid: &NodeUid) -> Result<(), RemoteError> {
        match self.nodes.get(uid) {
            Some(node) if node.kind == NodeKind::Folder => Ok(()),
            Some(_) => Err(RemoteError::new(format!("{uid} is not a folder"))),
            None => Err(RemoteError::new(format!("stale node reference: {uid}"))),
        }
    }

    fn child_of(&self, parent: &NodeUid, name: &str) -> Option<(NodeUid, NodeKind)> {
        self.nodes.iter().find_map(|(uid, node)| {
            (node.parent.as_ref() == Some(parent) && node.name == name)
                .then(|| (uid.clone(), node.kind))
        })
    }

    fn remove_subtree(&mut self, uid: &NodeUid) {
        let children: Vec<NodeUid> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.as_ref() == Some(uid))
            .map(|(u, _)| u.clone())
            .collect();
        for child in children {
            self.remove_subtree(&child);
        }
        self.nodes.remove(uid);
    }
}

/// Fake remote drive client for testing
#[derive(Clone)]
pub struct FakeRemote {
    inner: Arc<Mutex<FakeRemoteState>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeUid::new(ROOT_UID),
            FakeNode {
                name: String::new(),
                parent: None,
                kind: NodeKind::Folder,
                revision: 0,
            },
        );
        Self {
            inner: Arc::new(Mutex::new(FakeRemoteState {
                nodes,
                next_uid: 0,
                failures: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_uid(&self) -> NodeUid {
        NodeUid::new(ROOT_UID)
    }

    /// Queue a failure for the next call of the given operation.
    /// Operations: `root`, `list`, `create_folder`, `upload`,
    /// `upload_revision`, `trash`, `delete`, `relocate`.
    pub fn script_failure(&self, op: &str, message: &str) {
        self.inner
            .lock()
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    /// Queue the same failure `times` times.
    pub fn script_failures(&self, op: &str, times: usize, message: &str) {
        for _ in 0..times {
            self.script_failure(op, message);
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Walk a slash path from the root. Empty path is the root itself.
    pub fn node_by_path(&self, path: &str) -> Option<NodeUid> {
        let state = self.inner.lock();
        let mut current = NodeUid::new(ROOT_UID);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let (uid, _) = state.child_of(&current, segment)?;
            current = uid;
        }
        Some(current)
    }

    pub fn kind_of(&self, uid: &NodeUid) -> Option<NodeKind> {
        self.inner.lock().nodes.get(uid).map(|n| n.kind)
    }

    pub fn revision_of(&self, uid: &NodeUid) -> Option<u32> {
        self.inner.lock().nodes.get(uid).map(|n| n.revision)
    }

    pub fn parent_of(&self, uid: &NodeUid) -> Option<NodeUid> {
        self.inner.lock().nodes.get(uid).and_then(|n| n.parent.clone())
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Seed a node (and any missing parent folders) without recording
    /// calls, for test pre-state.
    pub fn seed(&self, path: &str, kind: NodeKind) -> NodeUid {
        let mut state = self.inner.lock();
        let mut current = NodeUid::new(ROOT_UID);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, &segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            if let Some((uid, _)) = state.child_of(&current, segment) {
                current = uid;
                continue;
            }
            let uid = state.fresh_uid();
            state.nodes.insert(
                uid.clone(),
                FakeNode {
                    name: segment.to_string(),
                    parent: Some(current.clone()),
                    kind: if last { kind } else { NodeKind::Folder },
                    revision: 1,
                },
            );
            current = uid;
        }
        current
    }
}

#[async_trait]
impl RemoteAdapter for FakeRemote {
    async fn my_files_root(&self) -> Result<NodeUid, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::MyFilesRoot);
        state.take_failure("root")?;
        Ok(NodeUid::new(ROOT_UID))
    }

    async fn list_children(&self, folder: &NodeUid) -> Result<Vec<RemoteChild>, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::ListChildren {
            folder: folder.clone(),
        });
        state.take_failure("list")?;
        state.require_folder(folder)?;

        let mut children: Vec<RemoteChild> = state
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.as_ref() == Some(folder))
            .map(|(uid, n)| RemoteChild {
                name: n.name.clone(),
                uid: uid.clone(),
                kind: n.kind,
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn create_folder(
        &self,
        parent: &NodeUid,
        name: &str,
    ) -> Result<NodeUid, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::CreateFolder {
            parent: parent.clone(),
            name: name.to_string(),
        });
        state.take_failure("create_folder")?;
        state.require_folder(parent)?;

        if let Some((uid, kind)) = state.child_of(parent, name) {
            return match kind {
                NodeKind::Folder => Ok(uid),
                NodeKind::File => {
                    Err(RemoteError::new(format!("{name} exists and is a file")))
                }
            };
        }

        let uid = state.fresh_uid();
        state.nodes.insert(
            uid.clone(),
            FakeNode {
                name: name.to_string(),
                parent: Some(parent.clone()),
                kind: NodeKind::Folder,
                revision: 1,
            },
        );
        Ok(uid)
    }

    async fn upload_file(
        &self,
        parent: &NodeUid,
        name: &str,
        _local_path: &Path,
    ) -> Result<NodeUid, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::UploadFile {
            parent: parent.clone(),
            name: name.to_string(),
        });
        state.take_failure("upload")?;
        state.require_folder(parent)?;

        if let Some((uid, kind)) = state.child_of(parent, name) {
            return match kind {
                NodeKind::File => {
                    if let Some(node) = state.nodes.get_mut(&uid) {
                        node.revision += 1;
                    }
                    Ok(uid)
                }
                NodeKind::Folder => {
                    Err(RemoteError::new(format!("{name} exists and is a folder")))
                }
            };
        }

        let uid = state.fresh_uid();
        state.nodes.insert(
            uid.clone(),
            FakeNode {
                name: name.to_string(),
                parent: Some(parent.clone()),
                kind: NodeKind::File,
                revision: 1,
            },
        );
        Ok(uid)
    }

    async fn upload_revision(
        &self,
        node: &NodeUid,
        _local_path: &Path,
    ) -> Result<NodeUid, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::UploadRevision { node: node.clone() });
        state.take_failure("upload_revision")?;

        match state.nodes.get_mut(node) {
            Some(n) if n.kind == NodeKind::File => {
                n.revision += 1;
                Ok(node.clone())
            }
            Some(_) => Err(RemoteError::new(format!("{node} is not a file"))),
            None => Err(RemoteError::new(format!("stale node reference: {node}"))),
        }
    }

    async fn trash_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::TrashNodes {
            uids: uids.to_vec(),
        });
        state.take_failure("trash")?;

        let outcomes = uids
            .iter()
            .map(|uid| {
                if state.nodes.contains_key(uid) {
                    state.remove_subtree(uid);
                    NodeOutcome::Done
                } else {
                    NodeOutcome::AlreadyAbsent
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn delete_nodes(&self, uids: &[NodeUid]) -> Result<Vec<NodeOutcome>, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::DeleteNodes {
            uids: uids.to_vec(),
        });
        state.take_failure("delete")?;

        let outcomes = uids
            .iter()
            .map(|uid| {
                if state.nodes.contains_key(uid) {
                    state.remove_subtree(uid);
                    NodeOutcome::Done
                } else {
                    NodeOutcome::AlreadyAbsent
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn relocate_node(
        &self,
        uid: &NodeUid,
        request: &RelocateRequest,
    ) -> Result<(), RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::Relocate {
            uid: uid.clone(),
            request: request.clone(),
        });
        state.take_failure("relocate")?;

        if let Some(parent) = &request.new_parent_uid {
            state.require_folder(parent)?;
        }
        let node = state
            .nodes
            .get_mut(uid)
            .ok_or_else(|| RemoteError::new(format!("stale node reference: {uid}")))?;
        if let Some(parent) = &request.new_parent_uid {
            node.parent = Some(parent.clone());
        }
        if let Some(name) = &request.new_name {
            node.name = name.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
