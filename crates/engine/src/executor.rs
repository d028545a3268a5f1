// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job execution against the remote drive.
//!
//! A worker task never propagates a job failure: every error is classified
//! and turned into a reschedule or a block. The only errors that escape
//! are store failures. Terminal DB mutations (status, hash, mapping)
//! commit in one transaction, so a crash mid-completion leaves the job
//! leased and startup recovery re-queues it.

use crate::queue::{FailureDisposition, JobQueue};
use crate::remote_tree::RemoteTree;
use crate::EngineError;
use drift_adapters::{NodeOutcome, RelocateRequest, RemoteAdapter, RemoteError};
use drift_core::{paths, Clock, ErrorCategory, NodeUid, SyncJob, SyncOp};
use drift_storage::{hashes, jobs, mappings, NodeMapping, Store, StoreError};
use std::path::Path;

/// Terminal disposition of one processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Synced,
    Rescheduled { n_retries: u32 },
    Blocked,
}

/// Failure internal to one job attempt.
enum JobError {
    /// Remote-side failure; the message feeds the classifier.
    Remote(String),
    /// Store failure; aborts the worker, not the job.
    Store(StoreError),
}

impl From<RemoteError> for JobError {
    fn from(e: RemoteError) -> Self {
        JobError::Remote(e.message)
    }
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        JobError::Store(e)
    }
}

/// Executes leased jobs against the remote.
#[derive(Clone)]
pub struct JobExecutor<R: RemoteAdapter, C: Clock> {
    store: Store,
    tree: RemoteTree<R>,
    clock: C,
    queue: JobQueue<C>,
}

impl<R: RemoteAdapter, C: Clock> JobExecutor<R, C> {
    pub fn new(store: Store, remote: R, clock: C, queue: JobQueue<C>) -> Self {
        Self {
            store,
            tree: RemoteTree::new(remote),
            clock,
            queue,
        }
    }

    /// Process one leased job to a terminal disposition for this attempt.
    pub async fn process(&self, job: &SyncJob) -> Result<JobOutcome, EngineError> {
        let attempt = match job.op {
            SyncOp::Delete => self.run_delete(job).await,
            SyncOp::Create | SyncOp::Update => self.run_upsert(job, false).await,
            SyncOp::Rename | SyncOp::Move => self.run_relocate(job).await,
        };

        let message = match attempt {
            Ok(()) => {
                tracing::info!(id = job.id, op = %job.op, local = %job.local_path, "job synced");
                return Ok(JobOutcome::Synced);
            }
            Err(JobError::Store(e)) => return Err(e.into()),
            Err(JobError::Remote(message)) => message,
        };

        let category = self.queue.policy().classify(&message);
        if category == ErrorCategory::ReuploadNeeded
            && job.op != SyncOp::Delete
            && self.queue.policy().should_heal(job.n_retries)
        {
            match self.heal(job).await {
                Ok(()) => {
                    tracing::info!(id = job.id, local = %job.local_path, "job healed and synced");
                    return Ok(JobOutcome::Synced);
                }
                Err(JobError::Store(e)) => return Err(e.into()),
                Err(JobError::Remote(heal_message)) => {
                    // Healing failed: fall back to an ordinary retry
                    return Ok(self.queue.fail(job, &heal_message).await?.into());
                }
            }
        }

        Ok(self.queue.fail(job, &message).await?.into())
    }

    async fn run_delete(&self, job: &SyncJob) -> Result<(), JobError> {
        if let Some(node) = self.tree.resolve(&job.remote_path).await? {
            let outcomes = self.tree.remote().trash_nodes(&[node.uid]).await?;
            if let Some(NodeOutcome::Failed(message)) = outcomes
                .iter()
                .find(|o| matches!(o, NodeOutcome::Failed(_)))
            {
                return Err(JobError::Remote(message.clone()));
            }
        }
        // Absent on the remote counts as deleted

        let mut tx = self.store.begin().await.map_err(JobError::Store)?;
        mappings::delete_by_local(&mut tx, &job.local_path).await?;
        jobs::mark_synced(&mut tx, job.id).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    /// CREATE and UPDATE: upload content (or make a folder), then record
    /// the node identity and hash. With `force_create` the in-place
    /// revision path is skipped, which is how healing re-uploads.
    async fn run_upsert(&self, job: &SyncJob, force_create: bool) -> Result<(), JobError> {
        let stripped = paths::strip_remote_root(&job.remote_path);
        let parent_path = paths::parent_of(stripped);
        let name = paths::basename(stripped);

        let existing = if force_create {
            None
        } else {
            let mut conn = self.store.acquire().await.map_err(JobError::Store)?;
            mappings::get_by_local(&mut conn, &job.local_path).await?
        };

        let (uid, parent_uid, is_directory) = match &job.content_hash {
            // Folder create: a file that exists always carries its hash
            None => {
                let parent_uid = self.tree.ensure_folder(parent_path).await?;
                let uid = self
                    .tree
                    .remote()
                    .create_folder(&parent_uid, name)
                    .await?;
                (uid, parent_uid, true)
            }
            Some(_) => match existing {
                Some(mapping) if job.op == SyncOp::Update && !mapping.is_directory => {
                    let uid = self
                        .tree
                        .remote()
                        .upload_revision(&mapping.node_uid, Path::new(&job.local_path))
                        .await?;
                    (uid, mapping.parent_node_uid, false)
                }
                _ => {
                    let parent_uid = self.tree.ensure_folder(parent_path).await?;
                    let uid = self
                        .tree
                        .remote()
                        .upload_file(&parent_uid, name, Path::new(&job.local_path))
                        .await?;
                    (uid, parent_uid, false)
                }
            },
        };

        self.commit_upsert(job, uid, parent_uid, is_directory).await
    }

    async fn commit_upsert(
        &self,
        job: &SyncJob,
        uid: NodeUid,
        parent_uid: NodeUid,
        is_directory: bool,
    ) -> Result<(), JobError> {
        let now = self.clock.now_utc();
        let mut tx = self.store.begin().await.map_err(JobError::Store)?;
        mappings::set(
            &mut tx,
            &NodeMapping {
                local_path: job.local_path.clone(),
                remote_path: job.remote_path.clone(),
                node_uid: uid,
                parent_node_uid: parent_uid,
                is_directory,
                updated_at: now,
            },
        )
        .await?;
        if let Some(hash) = &job.content_hash {
            hashes::set(&mut tx, &job.local_path, hash, now).await?;
        }
        jobs::mark_synced(&mut tx, job.id).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn run_relocate(&self, job: &SyncJob) -> Result<(), JobError> {
        let old_local = job
            .old_local_path
            .as_deref()
            .ok_or_else(|| JobError::Remote("Node mapping not found".to_string()))?;

        let mapping = {
            let mut conn = self.store.acquire().await.map_err(JobError::Store)?;
            mappings::get_by_local(&mut conn, old_local).await?
        }
        .ok_or_else(|| JobError::Remote("Node mapping not found".to_string()))?;

        let new_name = paths::basename(&job.local_path);
        let (request, new_parent) = match job.op {
            SyncOp::Rename => (
                RelocateRequest {
                    new_parent_uid: None,
                    new_name: Some(new_name.to_string()),
                },
                None,
            ),
            _ => {
                let stripped = paths::strip_remote_root(&job.remote_path);
                let parent_uid = self.tree.ensure_folder(paths::parent_of(stripped)).await?;
                let renamed = paths::basename(old_local) != new_name;
                (
                    RelocateRequest {
                        new_parent_uid: Some(parent_uid.clone()),
                        new_name: renamed.then(|| new_name.to_string()),
                    },
                    Some(parent_uid),
                )
            }
        };

        self.tree
            .remote()
            .relocate_node(&mapping.node_uid, &request)
            .await?;

        let now = self.clock.now_utc();
        let mut tx = self.store.begin().await.map_err(JobError::Store)?;
        mappings::rekey(
            &mut tx,
            old_local,
            &job.local_path,
            &job.remote_path,
            new_parent.as_ref(),
            now,
        )
        .await?;
        hashes::delete(&mut tx, old_local).await?;
        if let Some(hash) = &job.content_hash {
            hashes::set(&mut tx, &job.local_path, hash, now).await?;
        }
        jobs::mark_synced(&mut tx, job.id).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    /// Delete + create recovery for stale node references: trash the node
    /// the mapping points at, forget the mapping, and re-upload fresh.
    async fn heal(&self, job: &SyncJob) -> Result<(), JobError> {
        tracing::warn!(
            id = job.id,
            local = %job.local_path,
            n_retries = job.n_retries,
            "stale node reference persists, attempting delete + create"
        );
        let origin = job.old_local_path.as_deref().unwrap_or(&job.local_path);

        let stale = {
            let mut conn = self.store.acquire().await.map_err(JobError::Store)?;
            mappings::get_by_local(&mut conn, origin).await?
        };
        if let Some(mapping) = stale {
            // Outcomes are irrelevant here: the node is stale either way
            self.tree.remote().trash_nodes(&[mapping.node_uid]).await?;
        }

        {
            let mut conn = self.store.acquire().await.map_err(JobError::Store)?;
            mappings::delete_by_local(&mut conn, origin).await?;
            mappings::delete_by_local(&mut conn, &job.local_path).await?;
            hashes::delete(&mut conn, origin).await?;
        }

        self.run_upsert(job, true).await
    }
}

impl From<FailureDisposition> for JobOutcome {
    fn from(d: FailureDisposition) -> Self {
        match d {
            FailureDisposition::Rescheduled { n_retries } => {
                JobOutcome::Rescheduled { n_retries }
            }
            FailureDisposition::Blocked => JobOutcome::Blocked,
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
