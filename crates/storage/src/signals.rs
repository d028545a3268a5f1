// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable inter-process signal queue.
//!
//! Producers (typically a CLI front-end) append rows; the daemon's signal
//! bus consumes them. A row must be deleted in the same transaction that
//! hands it to a listener, before the listener runs — a handler may
//! terminate the process.

use crate::StoreError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// One queued signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

fn from_row(row: &SqliteRow) -> Result<Signal, StoreError> {
    Ok(Signal {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Append a signal to the queue.
pub async fn send(
    conn: &mut SqliteConnection,
    name: &str,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO signals (name, created_at) VALUES (?, ?) RETURNING id",
    )
    .bind(name)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn has(conn: &mut SqliteConnection, name: &str) -> Result<bool, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// All queued signals in arrival order.
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Signal>, StoreError> {
    let rows = sqlx::query("SELECT id, name, created_at FROM signals ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM signals WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
