//! Shared fixtures for engine specs.

use drift_adapters::{FakeRemote, FakeWatcher};
use drift_core::{
    EventBatch, FakeClock, FsEntryKind, FsEvent, JobStatus, SyncConfig, SyncDir,
};
use drift_engine::{EngineDeps, SyncEngine};
use drift_storage::{jobs, Store};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Store,
    pub watcher: FakeWatcher,
    pub remote: FakeRemote,
    pub clock: FakeClock,
    pub config_tx: watch::Sender<SyncConfig>,
    pub engine: SyncEngine<FakeWatcher, FakeRemote, FakeClock>,
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        sync_dirs: vec![SyncDir::new("/w")],
        sync_concurrency: 2,
        poll_interval_ms: 10,
        shutdown_timeout_secs: 5,
    }
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: SyncConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("sync.db")).await.unwrap();
        let watcher = FakeWatcher::new();
        let remote = FakeRemote::new();
        let clock = FakeClock::new();
        let (config_tx, config_rx) = watch::channel(config);
        let engine = SyncEngine::new(
            EngineDeps {
                store: store.clone(),
                watcher: watcher.clone(),
                remote: remote.clone(),
                clock: clock.clone(),
            },
            config_rx,
        )
        .with_signal_poll_interval(Duration::from_millis(10));
        Self {
            dir,
            store,
            watcher,
            remote,
            clock,
            config_tx,
            engine,
        }
    }

    /// Reopen the store from disk, as a fresh process would.
    pub async fn reopened_store(&self) -> Store {
        Store::open(&self.dir.path().join("sync.db")).await.unwrap()
    }

    pub async fn job_status(&self, local: &str, remote_path: &str) -> Option<JobStatus> {
        let mut conn = self.store.acquire().await.unwrap();
        jobs::get_by_key(&mut conn, local, remote_path)
            .await
            .unwrap()
            .map(|j| j.status)
    }
}

pub fn batch(events: Vec<FsEvent>) -> EventBatch {
    EventBatch {
        root: PathBuf::from("/w"),
        clock: Some("c:1".to_string()),
        events,
    }
}

pub fn file_event(
    name: &str,
    exists: bool,
    is_new: bool,
    ino: u64,
    hash: Option<&str>,
) -> FsEvent {
    FsEvent {
        name: name.to_string(),
        exists,
        is_new,
        kind: FsEntryKind::File,
        ino,
        content_sha1: hash.map(str::to_string),
    }
}
