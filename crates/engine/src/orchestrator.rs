// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine orchestration: one-shot sync and watch mode.
//!
//! The orchestrator owns the worker pool and the main loop. Watch mode
//! multiplexes four inputs: watcher batches, the executor tick, signal
//! deliveries, and config updates. Pausing only skips job dispatch; the
//! loop keeps heartbeating and translating so the queue reflects reality
//! the moment dispatch resumes.

use crate::executor::JobExecutor;
use crate::pool::WorkerPool;
use crate::queue::JobQueue;
use crate::signal_bus::{SignalBus, PAUSE_SYNC, RESUME_SYNC, STOP};
use crate::translator::Translator;
use crate::EngineError;
use drift_adapters::{RemoteAdapter, WatcherAdapter};
use drift_core::{Clock, EventBatch, RetryPolicy, SyncConfig};
use drift_storage::{clocks, flags, hashes, jobs, mappings, Store};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// SYNCED rows older than this are pruned at startup.
const SYNCED_RETENTION_DAYS: i64 = 7;

/// Totals from a one-shot sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Raw events the watcher replayed.
    pub total_events: u64,
    /// Jobs enqueued (or planned, on a dry run).
    pub enqueued: usize,
    /// Updates suppressed by the stored hash.
    pub suppressed: usize,
}

/// External collaborators handed to the engine.
pub struct EngineDeps<W, R, C> {
    pub store: Store,
    pub watcher: W,
    pub remote: R,
    pub clock: C,
}

enum Wake {
    Batch(Option<EventBatch>),
    Tick,
    Pause,
    Resume,
    Stop,
    ConfigChanged,
    ConfigClosed,
}

/// The sync engine: watcher → translator → queue → executor.
pub struct SyncEngine<W: WatcherAdapter, R: RemoteAdapter, C: Clock> {
    store: Store,
    watcher: W,
    clock: C,
    translator: Translator<C>,
    queue: JobQueue<C>,
    executor: JobExecutor<R, C>,
    signals: SignalBus<C>,
    pool: WorkerPool,
    config_rx: watch::Receiver<SyncConfig>,
    paused: bool,
    signal_poll_interval: Duration,
}

impl<W: WatcherAdapter, R: RemoteAdapter, C: Clock> SyncEngine<W, R, C> {
    pub fn new(deps: EngineDeps<W, R, C>, config_rx: watch::Receiver<SyncConfig>) -> Self {
        let EngineDeps {
            store,
            watcher,
            remote,
            clock,
        } = deps;
        let concurrency = Arc::new(AtomicUsize::new(config_rx.borrow().sync_concurrency));
        let queue = JobQueue::new(store.clone(), clock.clone(), RetryPolicy::new());
        Self {
            translator: Translator::new(store.clone(), clock.clone()),
            executor: JobExecutor::new(store.clone(), remote, clock.clone(), queue.clone()),
            signals: SignalBus::new(store.clone(), clock.clone()),
            pool: WorkerPool::new(concurrency),
            queue,
            store,
            watcher,
            clock,
            config_rx,
            paused: false,
            signal_poll_interval: crate::signal_bus::POLL_INTERVAL,
        }
    }

    /// Shorten the signal poll interval (tests).
    pub fn with_signal_poll_interval(mut self, interval: Duration) -> Self {
        self.signal_poll_interval = interval;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Handle for producing and observing signals on this engine's store.
    pub fn signal_bus(&self) -> SignalBus<C> {
        self.signals.clone()
    }

    /// One-shot sync: replay all pending changes and drain the queue.
    pub async fn sync_once(&mut self, dry_run: bool) -> Result<SyncSummary, EngineError> {
        let config = self.config_rx.borrow().clone();
        self.watcher.connect().await?;
        let result = self.sync_once_inner(&config, dry_run).await;
        if let Err(e) = self.watcher.close().await {
            tracing::warn!(error = %e, "watcher close failed");
        }
        result
    }

    async fn sync_once_inner(
        &mut self,
        config: &SyncConfig,
        dry_run: bool,
    ) -> Result<SyncSummary, EngineError> {
        self.cleanup(config).await?;

        let (batch_tx, mut batch_rx) = mpsc::channel(64);
        let total_events = self
            .watcher
            .query_all_changes(&config.sync_dirs, batch_tx)
            .await?;

        let mut summary = SyncSummary {
            total_events,
            ..SyncSummary::default()
        };
        while let Some(batch) = batch_rx.recv().await {
            let outcome = self.translator.apply_batch(config, &batch, dry_run).await?;
            summary.enqueued += outcome.enqueued;
            summary.suppressed += outcome.suppressed;
        }

        if !dry_run {
            self.pool
                .drain(&self.queue, &self.executor, &self.clock)
                .await?;
        }

        tracing::info!(
            total_events = summary.total_events,
            enqueued = summary.enqueued,
            suppressed = summary.suppressed,
            dry_run,
            "one-shot sync complete"
        );
        Ok(summary)
    }

    /// Watch mode: translate and execute continuously until a `stop`
    /// signal arrives.
    pub async fn watch(&mut self) -> Result<(), EngineError> {
        let mut config = self.config_rx.borrow().clone();
        self.watcher.connect().await?;
        self.cleanup(&config).await?;

        // Durable pause state survives restarts
        self.paused = {
            let mut conn = self.store.acquire().await?;
            flags::is_set(&mut conn, flags::PAUSED).await?
        };
        if self.paused {
            tracing::info!("starting paused (flag set)");
        }

        let (batch_tx, mut batch_rx) = mpsc::channel::<EventBatch>(64);
        self.watcher
            .subscribe(&config.sync_dirs, batch_tx.clone())
            .await?;

        let mut pause_rx = self.signals.listen(PAUSE_SYNC);
        let mut resume_rx = self.signals.listen(RESUME_SYNC);
        let mut stop_rx = self.signals.listen(STOP);
        let signal_task =
            tokio::spawn(self.signals.clone().run_polling(self.signal_poll_interval));

        let mut ticker = tokio::time::interval(config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut config_open = true;

        tracing::info!(dirs = config.sync_dirs.len(), "watch mode running");

        loop {
            let wake = tokio::select! {
                biased;
                Some(_) = stop_rx.recv() => Wake::Stop,
                Some(_) = pause_rx.recv() => Wake::Pause,
                Some(_) = resume_rx.recv() => Wake::Resume,
                changed = self.config_rx.changed(), if config_open => match changed {
                    Ok(()) => Wake::ConfigChanged,
                    Err(_) => Wake::ConfigClosed,
                },
                batch = batch_rx.recv() => Wake::Batch(batch),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Batch(Some(batch)) => {
                    self.translator.apply_batch(&config, &batch, false).await?;
                }
                Wake::Batch(None) => {
                    // Both ends held locally; closure means teardown
                    break;
                }
                Wake::Tick => {
                    self.pool.reap();
                    if !self.paused {
                        self.pool.tick(&self.queue, &self.executor).await?;
                    }
                }
                Wake::Pause => self.set_paused(true).await?,
                Wake::Resume => self.set_paused(false).await?,
                Wake::ConfigChanged => {
                    let new = self.config_rx.borrow_and_update().clone();
                    self.apply_config_update(&mut config, new, &batch_tx).await?;
                }
                Wake::ConfigClosed => config_open = false,
                Wake::Stop => {
                    tracing::info!("stop signal received");
                    break;
                }
            }
        }

        signal_task.abort();
        let clean = self.pool.shutdown(config.shutdown_timeout()).await;
        if !clean {
            tracing::warn!("in-flight jobs abandoned; they will be re-queued at next startup");
        }
        if let Err(e) = self.watcher.close().await {
            tracing::warn!(error = %e, "watcher close failed");
        }
        Ok(())
    }

    /// Startup cleanup: re-queue leased jobs, drop bookkeeping for
    /// directories no longer configured, prune old terminal rows.
    async fn cleanup(&self, config: &SyncConfig) -> Result<(), EngineError> {
        let now = self.clock.now_utc();
        let mut tx = self.store.begin().await?;

        let reset = jobs::reset_processing(&mut tx, now).await?;

        let roots = config.watch_roots();
        let mut dropped_clocks = 0;
        for root in clocks::list_roots(&mut tx).await? {
            if !roots.contains(&root) {
                dropped_clocks += clocks::delete(&mut tx, &root).await?;
            }
        }

        let mut dropped_rows = 0;
        for path in hashes::list_local_paths(&mut tx).await? {
            if !config.covers_local_path(&path) {
                hashes::delete(&mut tx, &path).await?;
                dropped_rows += 1;
            }
        }
        for path in mappings::list_local_paths(&mut tx).await? {
            if !config.covers_local_path(&path) {
                dropped_rows += mappings::delete_by_local(&mut tx, &path).await?;
            }
        }

        let cutoff = now - chrono::Duration::days(SYNCED_RETENTION_DAYS);
        let pruned = jobs::prune_synced_before(&mut tx, cutoff).await?;

        tx.commit().await.map_err(drift_storage::StoreError::from)?;

        if reset + dropped_clocks + dropped_rows + pruned > 0 {
            tracing::info!(
                reset_jobs = reset,
                dropped_clocks,
                dropped_rows,
                pruned_jobs = pruned,
                "startup cleanup"
            );
        }
        Ok(())
    }

    async fn set_paused(&mut self, paused: bool) -> Result<(), EngineError> {
        let now = self.clock.now_utc();
        let mut conn = self.store.acquire().await?;
        if paused {
            flags::set(&mut conn, flags::PAUSED, now).await?;
        } else {
            flags::clear(&mut conn, flags::PAUSED).await?;
        }
        self.paused = paused;
        tracing::info!(paused, "pause state changed");
        Ok(())
    }

    async fn apply_config_update(
        &mut self,
        current: &mut SyncConfig,
        new: SyncConfig,
        batch_tx: &mpsc::Sender<EventBatch>,
    ) -> Result<(), EngineError> {
        if new.sync_concurrency != current.sync_concurrency {
            tracing::info!(
                from = current.sync_concurrency,
                to = new.sync_concurrency,
                "sync concurrency updated"
            );
            self.pool
                .concurrency_handle()
                .store(new.sync_concurrency, std::sync::atomic::Ordering::Relaxed);
        }
        if new.sync_dirs != current.sync_dirs {
            tracing::info!(dirs = new.sync_dirs.len(), "sync dirs updated, resubscribing");
            self.cleanup(&new).await?;
            self.watcher
                .subscribe(&new.sync_dirs, batch_tx.clone())
                .await?;
        }
        *current = new;
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
