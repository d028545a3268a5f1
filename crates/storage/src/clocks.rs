// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-watched-directory watcher cursors.

use crate::StoreError;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

pub async fn get(
    conn: &mut SqliteConnection,
    root: &str,
) -> Result<Option<String>, StoreError> {
    Ok(sqlx::query_scalar("SELECT token FROM clocks WHERE root = ?")
        .bind(root)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn set(
    conn: &mut SqliteConnection,
    root: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO clocks (root, token, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(root) DO UPDATE SET \
             token = excluded.token, \
             updated_at = excluded.updated_at",
    )
    .bind(root)
    .bind(token)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn list_roots(conn: &mut SqliteConnection) -> Result<Vec<String>, StoreError> {
    Ok(sqlx::query_scalar("SELECT root FROM clocks ORDER BY root")
        .fetch_all(&mut *conn)
        .await?)
}

pub async fn delete(conn: &mut SqliteConnection, root: &str) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM clocks WHERE root = ?")
        .bind(root)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "clocks_tests.rs"]
mod tests;
