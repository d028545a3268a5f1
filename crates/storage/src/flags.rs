// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named boolean process flags. Presence of a row means the flag is set.
//!
//! Flags survive restarts; front-end processes read them to gate
//! double-starts and to acknowledge pause/resume handshakes.

use crate::StoreError;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// Daemon is running.
pub const RUNNING: &str = "running";
/// Job dispatch is paused.
pub const PAUSED: &str = "paused";
/// An OS service definition is installed.
pub const SERVICE_INSTALLED: &str = "service-installed";

pub async fn set(
    conn: &mut SqliteConnection,
    name: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("INSERT OR REPLACE INTO flags (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn clear(conn: &mut SqliteConnection, name: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM flags WHERE name = ?")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn is_set(conn: &mut SqliteConnection, name: &str) -> Result<bool, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
