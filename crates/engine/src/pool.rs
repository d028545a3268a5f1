// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool for job execution.
//!
//! The pool holds at most `concurrency` in-flight jobs. Each scheduler
//! tick fills free slots from the queue; per-path exclusivity comes from
//! the queue's unique key, not from the pool. Concurrency is read through
//! a shared atomic each tick so config reloads apply live.

use crate::executor::JobExecutor;
use crate::queue::JobQueue;
use crate::EngineError;
use drift_adapters::RemoteAdapter;
use drift_core::Clock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Longest idle sleep while draining with only deferred jobs left.
const MAX_IDLE_WAIT: Duration = Duration::from_secs(1);

/// Bounded set of in-flight job tasks.
pub struct WorkerPool {
    concurrency: Arc<AtomicUsize>,
    active: JoinSet<()>,
}

impl WorkerPool {
    pub fn new(concurrency: Arc<AtomicUsize>) -> Self {
        Self {
            concurrency,
            active: JoinSet::new(),
        }
    }

    /// Shared handle for live concurrency updates.
    pub fn concurrency_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.concurrency)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Clear tasks that already finished.
    pub fn reap(&mut self) {
        while self.active.try_join_next().is_some() {}
    }

    /// One scheduler tick: lease and spawn up to the free slot count.
    /// Returns how many jobs were spawned.
    pub async fn tick<R: RemoteAdapter, C: Clock>(
        &mut self,
        queue: &JobQueue<C>,
        executor: &JobExecutor<R, C>,
    ) -> Result<usize, EngineError> {
        self.reap();
        let slots = self
            .concurrency
            .load(Ordering::Relaxed)
            .saturating_sub(self.active.len());

        let mut spawned = 0;
        for _ in 0..slots {
            let Some(job) = queue.lease_next().await? else {
                break;
            };
            let executor = executor.clone();
            self.active.spawn(async move {
                if let Err(e) = executor.process(&job).await {
                    // Leased job stays PROCESSING; startup recovery re-queues it
                    tracing::error!(
                        id = job.id,
                        local = %job.local_path,
                        error = %e,
                        "store failure while completing job"
                    );
                }
            });
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Run until no task is active and no PENDING job remains. Deferred
    /// jobs are waited out, sleeping to their deadline.
    pub async fn drain<R: RemoteAdapter, C: Clock>(
        &mut self,
        queue: &JobQueue<C>,
        executor: &JobExecutor<R, C>,
        clock: &C,
    ) -> Result<(), EngineError> {
        loop {
            self.tick(queue, executor).await?;

            if !self.active.is_empty() {
                let _ = self.active.join_next().await;
                continue;
            }
            if !queue.has_pending().await? {
                return Ok(());
            }

            let wait = match queue.next_retry_at().await? {
                Some(at) => (at - clock.now_utc())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .clamp(Duration::from_millis(10), MAX_IDLE_WAIT),
                None => Duration::from_millis(10),
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Wait for active tasks up to `timeout`; abandon the rest. Returns
    /// whether shutdown was clean.
    pub async fn shutdown(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.active.join_next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(_) => {
                    tracing::warn!(
                        abandoned = self.active.len(),
                        "shutdown timeout, abandoning in-flight jobs"
                    );
                    self.active.shutdown().await;
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
