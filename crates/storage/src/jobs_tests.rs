// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;
use chrono::TimeZone;
use drift_core::SyncOp;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
}

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

fn update_spec(path: &str, hash: &str) -> JobSpec {
    JobSpec::update(path, format!("w{path}"), hash)
}

// ── Enqueue / upsert ─────────────────────────────────────────────────────────

#[tokio::test]
async fn enqueue_creates_pending_job_due_now() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let id = enqueue(&mut conn, &update_spec("/w/a", "h1"), t0()).await.unwrap();
    let job = get(&mut conn, id).await.unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_at, Some(t0()));
    assert_eq!(job.n_retries, 0);
    assert_eq!(job.content_hash.as_deref(), Some("h1"));
}

#[tokio::test]
async fn enqueue_same_key_replaces_and_resets_retry_state() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let id = enqueue(&mut conn, &update_spec("/w/a", "h1"), t0()).await.unwrap();
    reschedule(&mut conn, id, 3, t0() + chrono::Duration::seconds(64), "ECONNRESET")
        .await
        .unwrap();

    let id2 = enqueue(&mut conn, &update_spec("/w/a", "h2"), t0()).await.unwrap();
    assert_eq!(id, id2, "upsert keeps the row");

    let job = get(&mut conn, id).await.unwrap();
    assert_eq!(job.n_retries, 0);
    assert_eq!(job.last_error, None);
    assert_eq!(job.content_hash.as_deref(), Some("h2"));
    assert_eq!(job.retry_at, Some(t0()));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_jobs")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn enqueue_replaces_even_terminal_rows() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let id = enqueue(&mut conn, &update_spec("/w/a", "h1"), t0()).await.unwrap();
    mark_processing(&mut conn, id).await.unwrap();
    mark_synced(&mut conn, id).await.unwrap();

    enqueue(&mut conn, &update_spec("/w/a", "h2"), t0()).await.unwrap();
    let job = get(&mut conn, id).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[tokio::test]
async fn relocation_fields_round_trip() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let spec = JobSpec::relocation(
        SyncOp::Rename,
        "/w/a.txt",
        "w/a.txt",
        "/w/b.txt",
        "w/b.txt",
        Some("h1".to_string()),
    );
    let id = enqueue(&mut conn, &spec, t0()).await.unwrap();
    let job = get(&mut conn, id).await.unwrap();

    assert_eq!(job.op, SyncOp::Rename);
    assert_eq!(job.old_local_path.as_deref(), Some("/w/a.txt"));
    assert_eq!(job.old_remote_path.as_deref(), Some("w/a.txt"));
}

// ── Scheduling ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn next_pending_returns_smallest_due_retry_at() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let early = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    let late = enqueue(&mut conn, &update_spec("/w/b", "h"), t0()).await.unwrap();
    reschedule(&mut conn, late, 1, t0() - chrono::Duration::seconds(10), "x")
        .await
        .unwrap();

    let job = next_pending(&mut conn, t0()).await.unwrap().unwrap();
    assert_eq!(job.id, late, "earlier retry_at wins");

    mark_processing(&mut conn, late).await.unwrap();
    let job = next_pending(&mut conn, t0()).await.unwrap().unwrap();
    assert_eq!(job.id, early);
}

#[tokio::test]
async fn next_pending_skips_jobs_deferred_to_the_future() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let id = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    reschedule(&mut conn, id, 1, t0() + chrono::Duration::seconds(60), "x")
        .await
        .unwrap();

    assert!(next_pending(&mut conn, t0()).await.unwrap().is_none());
    let later = t0() + chrono::Duration::seconds(61);
    assert!(next_pending(&mut conn, later).await.unwrap().is_some());
}

#[tokio::test]
async fn next_pending_ignores_processing_and_terminal_jobs() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let a = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    mark_processing(&mut conn, a).await.unwrap();
    let b = enqueue(&mut conn, &update_spec("/w/b", "h"), t0()).await.unwrap();
    mark_processing(&mut conn, b).await.unwrap();
    mark_blocked(&mut conn, b, "quota exceeded").await.unwrap();

    assert!(next_pending(&mut conn, t0()).await.unwrap().is_none());
}

#[tokio::test]
async fn next_retry_at_reports_earliest_pending_deadline() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    assert!(next_retry_at(&mut conn).await.unwrap().is_none());

    let id = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    let deadline = t0() + chrono::Duration::seconds(120);
    reschedule(&mut conn, id, 1, deadline, "x").await.unwrap();

    assert_eq!(next_retry_at(&mut conn).await.unwrap(), Some(deadline));
}

// ── Terminal transitions and recovery ────────────────────────────────────────

#[tokio::test]
async fn mark_blocked_preserves_the_error() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let id = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    mark_blocked(&mut conn, id, "remote rejected: quota exceeded")
        .await
        .unwrap();

    let job = get(&mut conn, id).await.unwrap();
    assert_eq!(job.status, JobStatus::Blocked);
    assert_eq!(
        job.last_error.as_deref(),
        Some("remote rejected: quota exceeded")
    );
}

#[tokio::test]
async fn transitions_on_missing_jobs_are_not_found() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    assert!(matches!(
        mark_synced(&mut conn, 42).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        reschedule(&mut conn, 42, 1, t0(), "x").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn reset_processing_requeues_leased_jobs_due_now() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let a = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    let b = enqueue(&mut conn, &update_spec("/w/b", "h"), t0()).await.unwrap();
    mark_processing(&mut conn, a).await.unwrap();
    mark_processing(&mut conn, b).await.unwrap();
    mark_synced(&mut conn, b).await.unwrap();

    let reset = reset_processing(&mut conn, t0()).await.unwrap();
    assert_eq!(reset, 1);

    let job = get(&mut conn, a).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_at, Some(t0()));

    let done = get(&mut conn, b).await.unwrap();
    assert_eq!(done.status, JobStatus::Synced, "terminal jobs untouched");
}

// ── Bookkeeping ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn count_by_status_counts() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let a = enqueue(&mut conn, &update_spec("/w/a", "h"), t0()).await.unwrap();
    enqueue(&mut conn, &update_spec("/w/b", "h"), t0()).await.unwrap();
    mark_processing(&mut conn, a).await.unwrap();
    mark_synced(&mut conn, a).await.unwrap();

    assert_eq!(count_by_status(&mut conn, JobStatus::Pending).await.unwrap(), 1);
    assert_eq!(count_by_status(&mut conn, JobStatus::Synced).await.unwrap(), 1);
    assert_eq!(count_by_status(&mut conn, JobStatus::Blocked).await.unwrap(), 0);
}

#[tokio::test]
async fn prune_drops_only_old_synced_rows() {
    let store = store().await;
    let mut conn = store.acquire().await.unwrap();

    let old = enqueue(&mut conn, &update_spec("/w/old", "h"), t0()).await.unwrap();
    mark_processing(&mut conn, old).await.unwrap();
    mark_synced(&mut conn, old).await.unwrap();

    let fresh_at = t0() + chrono::Duration::days(10);
    let fresh = enqueue(&mut conn, &update_spec("/w/new", "h"), fresh_at)
        .await
        .unwrap();
    mark_processing(&mut conn, fresh).await.unwrap();
    mark_synced(&mut conn, fresh).await.unwrap();
    enqueue(&mut conn, &update_spec("/w/pending", "h"), t0()).await.unwrap();

    let cutoff = t0() + chrono::Duration::days(1);
    let pruned = prune_synced_before(&mut conn, cutoff).await.unwrap();
    assert_eq!(pruned, 1);

    assert!(matches!(get(&mut conn, old).await, Err(StoreError::NotFound(_))));
    assert!(get(&mut conn, fresh).await.is_ok());
    assert_eq!(count_by_status(&mut conn, JobStatus::Pending).await.unwrap(), 1);
}
