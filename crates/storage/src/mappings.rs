// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-path to remote-node identity mapping.
//!
//! A mapping row is what lets the engine relocate a node in place instead
//! of deleting and re-uploading it. No row means the remote identity is
//! unknown and relocation must fall back to delete + create.

use crate::StoreError;
use chrono::{DateTime, Utc};
use drift_core::NodeUid;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// One `node_mapping` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMapping {
    pub local_path: String,
    pub remote_path: String,
    pub node_uid: NodeUid,
    pub parent_node_uid: NodeUid,
    pub is_directory: bool,
    pub updated_at: DateTime<Utc>,
}

fn from_row(row: &SqliteRow) -> Result<NodeMapping, StoreError> {
    Ok(NodeMapping {
        local_path: row.try_get("local_path")?,
        remote_path: row.try_get("remote_path")?,
        node_uid: NodeUid::new(row.try_get::<String, _>("node_uid")?),
        parent_node_uid: NodeUid::new(row.try_get::<String, _>("parent_node_uid")?),
        is_directory: row.try_get("is_directory")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const MAPPING_COLUMNS: &str =
    "local_path, remote_path, node_uid, parent_node_uid, is_directory, updated_at";

pub async fn get(
    conn: &mut SqliteConnection,
    local_path: &str,
    remote_path: &str,
) -> Result<Option<NodeMapping>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {MAPPING_COLUMNS} FROM node_mapping WHERE local_path = ? AND remote_path = ?"
    ))
    .bind(local_path)
    .bind(remote_path)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Mapping for a local path, regardless of its remote placement.
pub async fn get_by_local(
    conn: &mut SqliteConnection,
    local_path: &str,
) -> Result<Option<NodeMapping>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {MAPPING_COLUMNS} FROM node_mapping WHERE local_path = ? LIMIT 1"
    ))
    .bind(local_path)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn set(
    conn: &mut SqliteConnection,
    mapping: &NodeMapping,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR REPLACE INTO node_mapping \
             (local_path, remote_path, node_uid, parent_node_uid, is_directory, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&mapping.local_path)
    .bind(&mapping.remote_path)
    .bind(mapping.node_uid.as_str())
    .bind(mapping.parent_node_uid.as_str())
    .bind(mapping.is_directory)
    .bind(mapping.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_by_local(
    conn: &mut SqliteConnection,
    local_path: &str,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM node_mapping WHERE local_path = ?")
        .bind(local_path)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Delete every row whose local path lies strictly below `local_path`.
pub async fn delete_under(
    conn: &mut SqliteConnection,
    local_path: &str,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "DELETE FROM node_mapping \
         WHERE substr(local_path, 1, length(?1) + 1) = ?1 || '/'",
    )
    .bind(local_path)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Re-key a mapping after a relocation, optionally moving it under a new
/// remote parent.
pub async fn rekey(
    conn: &mut SqliteConnection,
    old_local_path: &str,
    new_local_path: &str,
    new_remote_path: &str,
    new_parent: Option<&NodeUid>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE node_mapping SET \
             local_path = ?, \
             remote_path = ?, \
             parent_node_uid = COALESCE(?, parent_node_uid), \
             updated_at = ? \
         WHERE local_path = ?",
    )
    .bind(new_local_path)
    .bind(new_remote_path)
    .bind(new_parent.map(|u| u.as_str().to_string()))
    .bind(now)
    .bind(old_local_path)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("node mapping {old_local_path}")));
    }
    Ok(())
}

/// All mapped local paths (startup cleanup scans these against the
/// configured roots).
pub async fn list_local_paths(
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT local_path FROM node_mapping ORDER BY local_path")
            .fetch_all(&mut *conn)
            .await?,
    )
}

#[cfg(test)]
#[path = "mappings_tests.rs"]
mod tests;
