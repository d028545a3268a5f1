//! Watcher batch → translated jobs → remote mutations.

use crate::prelude::*;
use chrono::Utc;
use drift_core::{JobStatus, NodeUid, SyncOp};
use drift_storage::{hashes, mappings, NodeMapping};

async fn seed_mapping(harness: &Harness, local: &str, remote: &str, uid: &str) {
    let mut conn = harness.store.acquire().await.unwrap();
    mappings::set(
        &mut conn,
        &NodeMapping {
            local_path: local.to_string(),
            remote_path: remote.to_string(),
            node_uid: NodeUid::new(uid),
            parent_node_uid: NodeUid::new("p-1"),
            is_directory: false,
            updated_at: Utc::now(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn rename_within_directory_produces_one_rename_job() {
    let mut h = Harness::new().await;
    let uid = h.remote.seed("w/a.txt", drift_adapters::NodeKind::File);
    seed_mapping(&h, "/w/a.txt", "w/a.txt", uid.as_str()).await;

    h.watcher.script_batch(batch(vec![
        file_event("a.txt", false, false, 42, None),
        file_event("b.txt", true, true, 42, Some("h1")),
    ]));

    let summary = h.engine.sync_once(false).await.unwrap();
    assert_eq!(summary.enqueued, 1, "no DELETE, no CREATE");

    let mut conn = h.store.acquire().await.unwrap();
    let job = drift_storage::jobs::get_by_key(&mut conn, "/w/b.txt", "w/b.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.op, SyncOp::Rename);
    assert_eq!(job.old_local_path.as_deref(), Some("/w/a.txt"));
    assert_eq!(job.content_hash.as_deref(), Some("h1"));
    assert_eq!(job.status, JobStatus::Synced);
    drop(conn);

    // The node moved in place, identity preserved
    assert_eq!(h.remote.node_by_path("w/b.txt"), Some(uid));
    assert!(h.remote.node_by_path("w/a.txt").is_none());
}

#[tokio::test]
async fn unmapped_cross_directory_move_replays_as_delete_plus_create() {
    let mut h = Harness::new().await;

    h.watcher.script_batch(batch(vec![
        file_event("sub1/x", false, false, 7, None),
        file_event("sub2/x", true, true, 7, Some("h2")),
    ]));

    let summary = h.engine.sync_once(false).await.unwrap();
    assert_eq!(summary.enqueued, 2, "a DELETE and a CREATE");

    assert_eq!(
        h.job_status("/w/sub1/x", "w/sub1/x").await,
        Some(JobStatus::Synced)
    );
    assert_eq!(
        h.job_status("/w/sub2/x", "w/sub2/x").await,
        Some(JobStatus::Synced)
    );
    assert!(h.remote.node_by_path("w/sub2/x").is_some());
    assert!(h.remote.node_by_path("w/sub1/x").is_none());
}

#[tokio::test]
async fn update_with_unchanged_content_enqueues_no_job() {
    let mut h = Harness::new().await;
    {
        let mut conn = h.store.acquire().await.unwrap();
        hashes::set(&mut conn, "/w/f", "h3", Utc::now()).await.unwrap();
    }

    h.watcher
        .script_batch(batch(vec![file_event("f", true, false, 3, Some("h3"))]));

    let summary = h.engine.sync_once(false).await.unwrap();
    assert_eq!(summary.enqueued, 0);
    assert_eq!(summary.suppressed, 1);
    assert!(h.job_status("/w/f", "w/f").await.is_none());
}

#[tokio::test]
async fn fresh_tree_is_mirrored_with_parents_created_on_demand() {
    let mut h = Harness::new().await;

    h.watcher.script_batch(batch(vec![
        file_event("docs/report.txt", true, true, 1, Some("h1")),
        file_event("docs/img/logo.png", true, true, 2, Some("h2")),
        file_event("notes.txt", true, true, 3, Some("h3")),
    ]));

    let summary = h.engine.sync_once(false).await.unwrap();
    assert_eq!(summary.total_events, 3);
    assert_eq!(summary.enqueued, 3);

    for path in ["w/docs/report.txt", "w/docs/img/logo.png", "w/notes.txt"] {
        assert!(h.remote.node_by_path(path).is_some(), "missing {path}");
    }

    // Node identities were recorded for later relocations
    let mut conn = h.store.acquire().await.unwrap();
    let mapping = mappings::get_by_local(&mut conn, "/w/docs/img/logo.png")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Some(mapping.node_uid),
        h.remote.node_by_path("w/docs/img/logo.png")
    );
    assert_eq!(
        hashes::get(&mut conn, "/w/notes.txt").await.unwrap().as_deref(),
        Some("h3")
    );
}
