// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change translation: raw watcher batches to sync jobs.
//!
//! One batch becomes one store transaction: jobs, hash/mapping purges,
//! and the watcher cursor commit together, so observers never see a
//! half-translated batch. Rename detection pairs a disappearance and an
//! appearance that share an inode; whether the pair becomes an in-place
//! relocation or a delete + create depends on whether the node's remote
//! identity is known.

use crate::EngineError;
use drift_core::{paths, Clock, EventBatch, FsEvent, JobSpec, SyncConfig, SyncDir, SyncOp};
use drift_storage::{clocks, hashes, jobs, mappings, Store};
use sqlx::SqliteConnection;
use std::collections::HashMap;

/// What a batch translated into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Ids of jobs actually enqueued (empty on dry runs).
    pub job_ids: Vec<i64>,
    /// Jobs enqueued, or that would be on a dry run.
    pub enqueued: usize,
    /// Updates dropped because the content hash was unchanged.
    pub suppressed: usize,
}

/// A raw event with its mapped paths.
#[derive(Debug, Clone)]
struct Mapped {
    local: String,
    remote: String,
    event: FsEvent,
}

/// Translates watcher batches into queue mutations.
#[derive(Clone)]
pub struct Translator<C: Clock> {
    store: Store,
    clock: C,
}

impl<C: Clock> Translator<C> {
    pub fn new(store: Store, clock: C) -> Self {
        Self { store, clock }
    }

    /// Translate one batch inside a single transaction.
    ///
    /// Unknown roots are dropped: a batch can arrive for a directory that
    /// was just removed from the configuration.
    pub async fn apply_batch(
        &self,
        config: &SyncConfig,
        batch: &EventBatch,
        dry_run: bool,
    ) -> Result<BatchOutcome, EngineError> {
        let Some(dir) = config
            .sync_dirs
            .iter()
            .find(|d| d.local_root == batch.root)
        else {
            tracing::warn!(root = %batch.root.display(), "batch for unconfigured root, dropping");
            return Ok(BatchOutcome::default());
        };

        let (mut deletes, mut creates, updates) = partition(dir, &batch.events);
        let pairs = pair_by_ino(&mut deletes, &mut creates);

        let mut tx = self.store.begin().await?;
        let now = self.clock.now_utc();
        let mut outcome = BatchOutcome::default();

        let mut enqueue = Vec::new();

        for (from, to) in &pairs {
            let known = mappings::get_by_local(&mut tx, &from.local).await?.is_some();
            if known {
                let op = if paths::parent_of(&from.local) == paths::parent_of(&to.local) {
                    SyncOp::Rename
                } else {
                    SyncOp::Move
                };
                enqueue.push(JobSpec::relocation(
                    op,
                    from.local.clone(),
                    from.remote.clone(),
                    to.local.clone(),
                    to.remote.clone(),
                    to.event.content_sha1.clone(),
                ));
            } else {
                // Identity unknown remotely: replay as delete + create
                enqueue.push(JobSpec::delete(from.local.clone(), from.remote.clone()));
                if !dry_run {
                    purge_path(&mut tx, from).await?;
                }
                enqueue.push(JobSpec::create(
                    to.local.clone(),
                    to.remote.clone(),
                    to.event.content_sha1.clone(),
                ));
            }
        }

        for gone in deletes.iter().flatten() {
            enqueue.push(JobSpec::delete(gone.local.clone(), gone.remote.clone()));
            if !dry_run {
                purge_path(&mut tx, gone).await?;
            }
        }

        for fresh in creates.iter().flatten() {
            enqueue.push(JobSpec::create(
                fresh.local.clone(),
                fresh.remote.clone(),
                fresh.event.content_sha1.clone(),
            ));
        }

        for changed in &updates {
            if changed.event.kind.is_dir() {
                // Directory metadata has no remote representation
                continue;
            }
            let Some(new_hash) = changed.event.content_sha1.as_deref() else {
                continue;
            };
            let stored = hashes::get(&mut tx, &changed.local).await?;
            if stored.as_deref() == Some(new_hash) {
                outcome.suppressed += 1;
                continue;
            }
            enqueue.push(JobSpec::update(
                changed.local.clone(),
                changed.remote.clone(),
                new_hash,
            ));
        }

        outcome.enqueued = enqueue.len();
        if !dry_run {
            for spec in &enqueue {
                let id = jobs::enqueue(&mut tx, spec, now).await?;
                outcome.job_ids.push(id);
            }
            if let Some(token) = &batch.clock {
                let root = batch.root.to_string_lossy();
                clocks::set(&mut tx, root.trim_end_matches('/'), token, now).await?;
            }
        }
        tx.commit().await.map_err(drift_storage::StoreError::from)?;

        tracing::info!(
            root = %batch.root.display(),
            events = batch.events.len(),
            enqueued = outcome.enqueued,
            suppressed = outcome.suppressed,
            dry_run,
            "translated batch"
        );
        Ok(outcome)
    }
}

type Partitioned = (Vec<Option<Mapped>>, Vec<Option<Mapped>>, Vec<Mapped>);

fn partition(dir: &SyncDir, events: &[FsEvent]) -> Partitioned {
    let mut deletes = Vec::new();
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    for event in events {
        let mapped = Mapped {
            local: paths::local_path_for(&dir.local_root, &event.name),
            remote: paths::remote_path_for(&dir.local_root, &dir.remote_prefix, &event.name),
            event: event.clone(),
        };
        if !event.exists {
            deletes.push(Some(mapped));
        } else if event.is_new {
            creates.push(Some(mapped));
        } else {
            updates.push(mapped);
        }
    }
    (deletes, creates, updates)
}

/// Pair each disappearance with an appearance sharing its inode.
fn pair_by_ino(
    deletes: &mut [Option<Mapped>],
    creates: &mut [Option<Mapped>],
) -> Vec<(Mapped, Mapped)> {
    let mut create_idx: HashMap<u64, usize> = HashMap::new();
    for (i, c) in creates.iter().enumerate() {
        if let Some(c) = c {
            create_idx.entry(c.event.ino).or_insert(i);
        }
    }

    let mut pairs = Vec::new();
    for slot in deletes.iter_mut() {
        let ino = match slot {
            Some(d) => d.event.ino,
            None => continue,
        };
        if let Some(&ci) = create_idx.get(&ino) {
            if let Some(create) = creates[ci].take() {
                if let Some(delete) = slot.take() {
                    pairs.push((delete, create));
                }
            }
        }
    }
    pairs
}

/// Drop hash and mapping bookkeeping for a path that no longer exists,
/// including everything below it for directories.
async fn purge_path(tx: &mut SqliteConnection, gone: &Mapped) -> Result<(), EngineError> {
    hashes::delete(tx, &gone.local).await?;
    mappings::delete_by_local(tx, &gone.local).await?;
    if gone.event.kind.is_dir() {
        hashes::delete_under(tx, &gone.local).await?;
        mappings::delete_under(tx, &gone.local).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
