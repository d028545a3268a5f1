// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;
use chrono::TimeZone;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
}

fn mapping(local: &str, remote: &str, uid: &str) -> NodeMapping {
    NodeMapping {
        local_path: local.to_string(),
        remote_path: remote.to_string(),
        node_uid: NodeUid::new(uid),
        parent_node_uid: NodeUid::new("p-1"),
        is_directory: false,
        updated_at: t0(),
    }
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    let m = mapping("/w/a.txt", "w/a.txt", "uid-1");
    set(&mut conn, &m).await.unwrap();

    let loaded = get(&mut conn, "/w/a.txt", "w/a.txt").await.unwrap().unwrap();
    assert_eq!(loaded, m);
    assert!(get(&mut conn, "/w/a.txt", "elsewhere").await.unwrap().is_none());
}

#[tokio::test]
async fn set_replaces_existing_key() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    set(&mut conn, &mapping("/w/a", "w/a", "uid-1")).await.unwrap();
    set(&mut conn, &mapping("/w/a", "w/a", "uid-2")).await.unwrap();

    let loaded = get_by_local(&mut conn, "/w/a").await.unwrap().unwrap();
    assert_eq!(loaded.node_uid, NodeUid::new("uid-2"));
}

#[tokio::test]
async fn rekey_moves_path_and_optionally_parent() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    set(&mut conn, &mapping("/w/a.txt", "w/a.txt", "uid-1")).await.unwrap();

    // Rename: parent unchanged
    rekey(&mut conn, "/w/a.txt", "/w/b.txt", "w/b.txt", None, t0())
        .await
        .unwrap();
    let renamed = get_by_local(&mut conn, "/w/b.txt").await.unwrap().unwrap();
    assert_eq!(renamed.parent_node_uid, NodeUid::new("p-1"));
    assert!(get_by_local(&mut conn, "/w/a.txt").await.unwrap().is_none());

    // Move: new parent uid
    let new_parent = NodeUid::new("p-2");
    rekey(
        &mut conn,
        "/w/b.txt",
        "/w/sub/b.txt",
        "w/sub/b.txt",
        Some(&new_parent),
        t0(),
    )
    .await
    .unwrap();
    let moved = get_by_local(&mut conn, "/w/sub/b.txt").await.unwrap().unwrap();
    assert_eq!(moved.parent_node_uid, new_parent);
    assert_eq!(moved.node_uid, NodeUid::new("uid-1"), "node identity preserved");
}

#[tokio::test]
async fn rekey_of_unknown_mapping_is_not_found() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    let err = rekey(&mut conn, "/w/ghost", "/w/b", "w/b", None, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn delete_under_purges_strict_descendants_only() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    set(&mut conn, &mapping("/w/dir", "w/dir", "uid-d")).await.unwrap();
    set(&mut conn, &mapping("/w/dir/a", "w/dir/a", "uid-a")).await.unwrap();
    set(&mut conn, &mapping("/w/dir/s/b", "w/dir/s/b", "uid-b")).await.unwrap();
    set(&mut conn, &mapping("/w/dirx", "w/dirx", "uid-x")).await.unwrap();

    let purged = delete_under(&mut conn, "/w/dir").await.unwrap();
    assert_eq!(purged, 2);

    assert!(get_by_local(&mut conn, "/w/dir").await.unwrap().is_some());
    assert!(get_by_local(&mut conn, "/w/dirx").await.unwrap().is_some());
    assert!(get_by_local(&mut conn, "/w/dir/a").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_by_local_removes_the_row() {
    let store = Store::open_in_memory().await.unwrap();
    let mut conn = store.acquire().await.unwrap();

    set(&mut conn, &mapping("/w/a", "w/a", "uid-1")).await.unwrap();
    assert_eq!(delete_by_local(&mut conn, "/w/a").await.unwrap(), 1);
    assert_eq!(delete_by_local(&mut conn, "/w/a").await.unwrap(), 0);
}
