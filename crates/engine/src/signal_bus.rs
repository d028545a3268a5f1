// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable signal queue with in-process dispatch.
//!
//! Signals are rows in the store, so any process sharing the database can
//! produce them. The daemon polls the queue and hands matching rows to
//! registered listeners. A row is deleted (and the delete committed)
//! before its listener is notified: a stop handler may never return.
//! Rows without a listener stay queued — front-ends use that as a
//! readiness handshake.

use crate::EngineError;
use drift_core::Clock;
use drift_storage::{signals, Signal, Store};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Pause job dispatch.
pub const PAUSE_SYNC: &str = "pause-sync";
/// Resume job dispatch.
pub const RESUME_SYNC: &str = "resume-sync";
/// Stop the daemon.
pub const STOP: &str = "stop";
/// Re-read the configuration file.
pub const RELOAD_CONFIG: &str = "reload-config";

/// Default queue scan interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

type Listeners = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Signal>>>>;

/// Durable signal queue + in-process broadcast.
#[derive(Clone)]
pub struct SignalBus<C: Clock> {
    store: Store,
    clock: C,
    listeners: Listeners,
}

impl<C: Clock> SignalBus<C> {
    pub fn new(store: Store, clock: C) -> Self {
        Self {
            store,
            clock,
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Append a signal to the durable queue.
    pub async fn send(&self, name: &str) -> Result<i64, EngineError> {
        let mut conn = self.store.acquire().await?;
        Ok(signals::send(&mut conn, name, self.clock.now_utc()).await?)
    }

    /// Whether a signal with this name is queued.
    pub async fn has(&self, name: &str) -> Result<bool, EngineError> {
        let mut conn = self.store.acquire().await?;
        Ok(signals::has(&mut conn, name).await?)
    }

    /// Register a listener for a signal name. The latest registration
    /// for a name wins.
    pub fn listen(&self, name: &str) -> mpsc::UnboundedReceiver<Signal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().insert(name.to_string(), tx);
        rx
    }

    /// One queue scan. Rows with a registered listener are deleted inside
    /// a transaction, then delivered. Returns how many were dispatched.
    pub async fn poll_once(&self) -> Result<usize, EngineError> {
        let mut tx = self.store.begin().await?;
        let queued = signals::list(&mut tx).await?;

        let mut matched = Vec::new();
        {
            let listeners = self.listeners.lock();
            for signal in queued {
                if listeners.contains_key(&signal.name) {
                    matched.push(signal);
                }
            }
        }
        for signal in &matched {
            signals::delete(&mut tx, signal.id).await?;
        }
        tx.commit().await.map_err(drift_storage::StoreError::from)?;

        // Deletes are durable; now it is safe to run handlers
        let mut dispatched = 0;
        for signal in matched {
            let tx = self.listeners.lock().get(&signal.name).cloned();
            if let Some(tx) = tx {
                tracing::debug!(name = %signal.name, id = signal.id, "dispatching signal");
                if tx.send(signal.clone()).is_err() {
                    tracing::warn!(name = %signal.name, "signal listener dropped, discarding");
                    self.listeners.lock().remove(&signal.name);
                    continue;
                }
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Poll the queue forever at the given interval. Spawn this as a
    /// task and abort it on shutdown.
    pub async fn run_polling(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "signal poll failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "signal_bus_tests.rs"]
mod tests;
