// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-propagated content hashes, keyed by local path.
//!
//! A row means "the remote holds content with this hash for this path".
//! The translator consults it to drop no-op updates; the executor writes
//! it in the same transaction as the job's terminal status.

use crate::StoreError;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

pub async fn get(
    conn: &mut SqliteConnection,
    local_path: &str,
) -> Result<Option<String>, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT content_hash FROM file_hashes WHERE local_path = ?")
            .bind(local_path)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

pub async fn set(
    conn: &mut SqliteConnection,
    local_path: &str,
    content_hash: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO file_hashes (local_path, content_hash, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(local_path) DO UPDATE SET \
             content_hash = excluded.content_hash, \
             updated_at = excluded.updated_at",
    )
    .bind(local_path)
    .bind(content_hash)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, local_path: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM file_hashes WHERE local_path = ?")
        .bind(local_path)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete every row strictly below `local_path`.
///
/// The substr comparison sidesteps LIKE wildcard interpretation in paths.
pub async fn delete_under(
    conn: &mut SqliteConnection,
    local_path: &str,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "DELETE FROM file_hashes \
         WHERE substr(local_path, 1, length(?1) + 1) = ?1 || '/'",
    )
    .bind(local_path)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// All tracked local paths (startup cleanup scans these against the
/// configured roots).
pub async fn list_local_paths(
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT local_path FROM file_hashes ORDER BY local_path")
            .fetch_all(&mut *conn)
            .await?,
    )
}

#[cfg(test)]
#[path = "hashes_tests.rs"]
mod tests;
