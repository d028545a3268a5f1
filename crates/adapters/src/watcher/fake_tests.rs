// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drift_core::{FsEntryKind, FsEvent};
use std::path::PathBuf;

fn batch(root: &str, names: &[&str]) -> EventBatch {
    EventBatch {
        root: PathBuf::from(root),
        clock: Some("c:1".to_string()),
        events: names
            .iter()
            .map(|n| FsEvent {
                name: n.to_string(),
                exists: true,
                is_new: true,
                kind: FsEntryKind::File,
                ino: 1,
                content_sha1: Some("h".to_string()),
            })
            .collect(),
    }
}

#[tokio::test]
async fn query_requires_connect() {
    let watcher = FakeWatcher::new();
    let (tx, _rx) = mpsc::channel(4);
    let err = watcher.query_all_changes(&[], tx).await.unwrap_err();
    assert!(matches!(err, WatcherError::NotConnected));
}

#[tokio::test]
async fn query_replays_scripted_batches_and_counts_events() {
    let watcher = FakeWatcher::new();
    watcher.connect().await.unwrap();
    watcher.script_batch(batch("/w", &["a", "b"]));
    watcher.script_batch(batch("/w", &["c"]));

    let (tx, mut rx) = mpsc::channel(4);
    let total = watcher.query_all_changes(&[], tx).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(rx.recv().await.unwrap().events.len(), 2);
    assert_eq!(rx.recv().await.unwrap().events.len(), 1);
}

#[tokio::test]
async fn subscribe_then_deliver_pushes_batches() {
    let watcher = FakeWatcher::new();
    watcher.connect().await.unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    watcher
        .subscribe(&[SyncDir::new("/w")], tx)
        .await
        .unwrap();
    assert!(watcher.has_subscription());

    watcher.deliver(batch("/w", &["a"])).await;
    assert_eq!(rx.recv().await.unwrap().events.len(), 1);

    watcher.close().await.unwrap();
    assert!(!watcher.has_subscription());
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let watcher = FakeWatcher::new();
    watcher.connect().await.unwrap();
    let (tx, _rx) = mpsc::channel(4);
    watcher
        .subscribe(&[SyncDir::new("/w")], tx)
        .await
        .unwrap();
    watcher.close().await.unwrap();

    let calls = watcher.calls();
    assert_eq!(calls[0], WatcherCall::Connect);
    assert_eq!(
        calls[1],
        WatcherCall::Subscribe {
            roots: vec!["/w".to_string()]
        }
    );
    assert_eq!(calls[2], WatcherCall::Close);
}
