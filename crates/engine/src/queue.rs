// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue policy: enqueue, lease, and failure handling.
//!
//! The rows live in the store; this layer adds the retry policy. Leasing
//! runs fetch + mark-PROCESSING in one transaction so two pool slots can
//! never pick up the same job.

use crate::EngineError;
use drift_core::{Clock, JobSpec, RetryDecision, RetryPolicy, ShortId, SyncJob};
use drift_storage::{jobs, Store};

/// What happened to a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Back in PENDING with the updated retry counter.
    Rescheduled { n_retries: u32 },
    /// Terminal; `last_error` preserved for the operator.
    Blocked,
}

/// Persistent job queue with backoff.
#[derive(Clone)]
pub struct JobQueue<C: Clock> {
    store: Store,
    clock: C,
    policy: RetryPolicy,
}

impl<C: Clock> JobQueue<C> {
    pub fn new(store: Store, clock: C, policy: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Upsert a PENDING job due immediately. `dry_run` makes this a no-op.
    pub async fn enqueue(
        &self,
        spec: &JobSpec,
        dry_run: bool,
    ) -> Result<Option<i64>, EngineError> {
        if dry_run {
            return Ok(None);
        }
        let mut conn = self.store.acquire().await?;
        let id = jobs::enqueue(&mut conn, spec, self.clock.now_utc()).await?;
        tracing::debug!(
            id,
            op = %spec.op,
            local = %spec.local_path,
            hash = spec.content_hash.as_deref().unwrap_or("").short(8),
            "job enqueued"
        );
        Ok(Some(id))
    }

    /// Lease the next due job: fetch and mark PROCESSING atomically.
    pub async fn lease_next(&self) -> Result<Option<SyncJob>, EngineError> {
        let mut tx = self.store.begin().await?;
        let Some(mut job) = jobs::next_pending(&mut tx, self.clock.now_utc()).await? else {
            return Ok(None);
        };
        jobs::mark_processing(&mut tx, job.id).await?;
        tx.commit().await.map_err(drift_storage::StoreError::from)?;
        job.status = drift_core::JobStatus::Processing;
        Ok(Some(job))
    }

    /// Apply the retry policy to a failure and persist the outcome.
    pub async fn fail(
        &self,
        job: &SyncJob,
        error: &str,
    ) -> Result<FailureDisposition, EngineError> {
        let mut conn = self.store.acquire().await?;
        match self.policy.on_failure(job.n_retries, error) {
            RetryDecision::Retry { n_retries, delay } => {
                let retry_at = self.clock.now_utc()
                    + chrono::Duration::from_std(delay).unwrap_or_default();
                jobs::reschedule(&mut conn, job.id, n_retries, retry_at, error).await?;
                tracing::warn!(
                    id = job.id,
                    op = %job.op,
                    local = %job.local_path,
                    n_retries,
                    delay_secs = delay.as_secs(),
                    error,
                    "job failed, rescheduled"
                );
                Ok(FailureDisposition::Rescheduled { n_retries })
            }
            RetryDecision::Block => {
                jobs::mark_blocked(&mut conn, job.id, error).await?;
                tracing::error!(
                    id = job.id,
                    op = %job.op,
                    local = %job.local_path,
                    error,
                    "job blocked after exhausting retries"
                );
                Ok(FailureDisposition::Blocked)
            }
        }
    }

    /// Whether any PENDING job remains, due or deferred.
    pub async fn has_pending(&self) -> Result<bool, EngineError> {
        let mut conn = self.store.acquire().await?;
        let count = jobs::count_by_status(&mut conn, drift_core::JobStatus::Pending).await?;
        Ok(count > 0)
    }

    /// Earliest deadline among PENDING jobs.
    pub async fn next_retry_at(
        &self,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, EngineError> {
        let mut conn = self.store.acquire().await?;
        Ok(jobs::next_retry_at(&mut conn).await?)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
