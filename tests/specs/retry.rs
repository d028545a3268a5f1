//! Failure classification, backoff, and self-healing.

use crate::prelude::*;
use chrono::Utc;
use drift_core::{Clock, JobSpec, JobStatus, NodeUid, RetryPolicy};
use drift_engine::{JobExecutor, JobOutcome, JobQueue};
use drift_storage::{jobs, mappings, NodeMapping};
use std::time::Duration;

struct RetryHarness {
    harness: Harness,
    queue: JobQueue<drift_core::FakeClock>,
    executor: JobExecutor<drift_adapters::FakeRemote, drift_core::FakeClock>,
}

async fn retry_harness() -> RetryHarness {
    let harness = Harness::new().await;
    let queue = JobQueue::new(
        harness.store.clone(),
        harness.clock.clone(),
        RetryPolicy::without_jitter(),
    );
    let executor = JobExecutor::new(
        harness.store.clone(),
        harness.remote.clone(),
        harness.clock.clone(),
        queue.clone(),
    );
    RetryHarness {
        harness,
        queue,
        executor,
    }
}

#[tokio::test]
async fn network_failures_retry_forever_with_capped_backoff() {
    let r = retry_harness().await;
    r.harness
        .remote
        .script_failures("upload", 6, "read ECONNRESET");

    let spec = JobSpec::create("/w/a.txt", "w/a.txt", Some("h".into()));
    r.queue.enqueue(&spec, false).await.unwrap();

    for _ in 0..6 {
        r.harness.clock.advance(Duration::from_secs(400));
        let job = r.queue.lease_next().await.unwrap().unwrap();
        let outcome = r.executor.process(&job).await.unwrap();
        assert!(matches!(outcome, JobOutcome::Rescheduled { .. }));
    }

    let mut conn = r.harness.store.acquire().await.unwrap();
    let job = jobs::get_by_key(&mut conn, "/w/a.txt", "w/a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending, "never blocked");
    assert_eq!(job.n_retries, 6, "counter capped at six");

    // After attempt five the delay sits at the 256 s cap (±25 % jitter)
    let delta = job.retry_at.unwrap() - r.harness.clock.now_utc();
    assert!(delta <= chrono::Duration::seconds(320));
}

#[tokio::test]
async fn permanent_failures_block_after_eleven_attempts() {
    let r = retry_harness().await;
    r.harness
        .remote
        .script_failures("upload", 11, "remote rejected: quota exceeded");

    let spec = JobSpec::create("/w/a.txt", "w/a.txt", Some("h".into()));
    r.queue.enqueue(&spec, false).await.unwrap();

    let mut outcome = JobOutcome::Synced;
    for _ in 0..11 {
        r.harness.clock.advance(Duration::from_secs(700_000));
        let job = r.queue.lease_next().await.unwrap().unwrap();
        outcome = r.executor.process(&job).await.unwrap();
    }
    assert_eq!(outcome, JobOutcome::Blocked);

    let mut conn = r.harness.store.acquire().await.unwrap();
    let job = jobs::get_by_key(&mut conn, "/w/a.txt", "w/a.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Blocked);
    assert!(job
        .last_error
        .as_deref()
        .unwrap()
        .contains("quota exceeded"));
}

#[tokio::test]
async fn stale_node_reference_heals_on_the_third_attempt() {
    let r = retry_harness().await;

    // Mapping points at a node the remote no longer recognizes
    {
        let mut conn = r.harness.store.acquire().await.unwrap();
        mappings::set(
            &mut conn,
            &NodeMapping {
                local_path: "/w/f.txt".to_string(),
                remote_path: "w/f.txt".to_string(),
                node_uid: NodeUid::new("n-ghost"),
                parent_node_uid: NodeUid::new("p-1"),
                is_directory: false,
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    let spec = JobSpec::update("/w/f.txt", "w/f.txt", "h2");
    r.queue.enqueue(&spec, false).await.unwrap();

    // Two ordinary failures first
    for expected in 1..=2u32 {
        r.harness.clock.advance(Duration::from_secs(60));
        let job = r.queue.lease_next().await.unwrap().unwrap();
        let outcome = r.executor.process(&job).await.unwrap();
        assert_eq!(outcome, JobOutcome::Rescheduled { n_retries: expected });
    }

    // Third execution deletes and re-creates
    r.harness.clock.advance(Duration::from_secs(60));
    let job = r.queue.lease_next().await.unwrap().unwrap();
    let outcome = r.executor.process(&job).await.unwrap();
    assert_eq!(outcome, JobOutcome::Synced);

    let fresh = r.harness.remote.node_by_path("w/f.txt").unwrap();
    assert_ne!(fresh.as_str(), "n-ghost");

    let mut conn = r.harness.store.acquire().await.unwrap();
    let mapping = mappings::get_by_local(&mut conn, "/w/f.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.node_uid, fresh, "mapping rebound to the new node");
    let job = jobs::get_by_key(&mut conn, "/w/f.txt", "w/f.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Synced);
}
