//! Crash recovery and idempotence.

use crate::prelude::*;
use drift_core::{JobSpec, JobStatus, RetryPolicy};
use drift_engine::JobQueue;
use drift_storage::jobs;

#[tokio::test]
async fn restart_requeues_leased_jobs_and_completes_them_once() {
    let h = Harness::new().await;

    // A previous process leased the job, then died
    let queue = JobQueue::new(
        h.store.clone(),
        h.clock.clone(),
        RetryPolicy::without_jitter(),
    );
    let spec = JobSpec::create("/w/f.txt", "w/f.txt", Some("h1".into()));
    queue.enqueue(&spec, false).await.unwrap();
    let leased = queue.lease_next().await.unwrap().unwrap();
    assert_eq!(leased.status, JobStatus::Processing);

    // New process: fresh store handle, startup cleanup, drain
    let reopened = h.reopened_store().await;
    let (config_tx, config_rx) = tokio::sync::watch::channel(test_config());
    let mut engine = drift_engine::SyncEngine::new(
        drift_engine::EngineDeps {
            store: reopened.clone(),
            watcher: h.watcher.clone(),
            remote: h.remote.clone(),
            clock: h.clock.clone(),
        },
        config_rx,
    );
    engine.sync_once(false).await.unwrap();
    drop(config_tx);

    let mut conn = reopened.acquire().await.unwrap();
    let job = jobs::get_by_key(&mut conn, "/w/f.txt", "w/f.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Synced, "job neither lost nor stuck");

    // Completed exactly once
    let uid = h.remote.node_by_path("w/f.txt").unwrap();
    assert_eq!(h.remote.revision_of(&uid), Some(1));
    assert_eq!(
        jobs::count_by_status(&mut conn, JobStatus::Processing)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn enqueueing_the_same_change_twice_yields_one_pending_job() {
    let h = Harness::new().await;
    let queue = JobQueue::new(
        h.store.clone(),
        h.clock.clone(),
        RetryPolicy::without_jitter(),
    );

    let spec = JobSpec::update("/w/f.txt", "w/f.txt", "h1");
    let first = queue.enqueue(&spec, false).await.unwrap().unwrap();
    let second = queue.enqueue(&spec, false).await.unwrap().unwrap();
    assert_eq!(first, second);

    let mut conn = h.store.acquire().await.unwrap();
    assert_eq!(
        jobs::count_by_status(&mut conn, JobStatus::Pending)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn stop_signal_queues_until_the_daemon_listens() {
    let h = Harness::new().await;
    let bus = h.engine.signal_bus();

    // A front-end can queue the signal before any listener exists
    bus.send(drift_engine::STOP).await.unwrap();
    assert!(bus.has(drift_engine::STOP).await.unwrap());

    let (store, watcher) = (h.store.clone(), h.watcher.clone());
    let mut engine = h.engine;
    let handle = tokio::spawn(async move { engine.watch().await });

    // The queued signal stops the daemon as soon as it subscribes
    handle.await.unwrap().unwrap();
    assert!(!watcher.is_connected());

    let mut conn = store.acquire().await.unwrap();
    assert!(!drift_storage::signals::has(&mut conn, drift_engine::STOP)
        .await
        .unwrap());
}
