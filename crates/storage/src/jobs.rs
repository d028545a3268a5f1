// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync job queue rows.
//!
//! One row per `(local_path, remote_path)` key, enforced by a unique
//! index. Enqueueing an existing key replaces the row wholesale: latest
//! change wins and the retry counter starts over.

use crate::StoreError;
use chrono::{DateTime, Utc};
use drift_core::{JobSpec, JobStatus, SyncJob};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const JOB_COLUMNS: &str = "id, event_type, local_path, remote_path, status, retry_at, \
     n_retries, last_error, content_hash, old_local_path, old_remote_path, created_at";

fn from_row(row: &SqliteRow) -> Result<SyncJob, StoreError> {
    let op: String = row.try_get("event_type")?;
    let status: String = row.try_get("status")?;
    Ok(SyncJob {
        id: row.try_get("id")?,
        op: op.parse()?,
        local_path: row.try_get("local_path")?,
        remote_path: row.try_get("remote_path")?,
        status: status.parse()?,
        retry_at: row.try_get("retry_at")?,
        n_retries: row.try_get::<i64, _>("n_retries")? as u32,
        last_error: row.try_get("last_error")?,
        content_hash: row.try_get("content_hash")?,
        old_local_path: row.try_get("old_local_path")?,
        old_remote_path: row.try_get("old_remote_path")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Upsert a PENDING job, due immediately. Returns the row id.
pub async fn enqueue(
    conn: &mut SqliteConnection,
    spec: &JobSpec,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO sync_jobs (event_type, local_path, remote_path, status, retry_at, \
             n_retries, last_error, content_hash, old_local_path, old_remote_path, created_at) \
         VALUES (?, ?, ?, 'PENDING', ?, 0, NULL, ?, ?, ?, ?) \
         ON CONFLICT(local_path, remote_path) DO UPDATE SET \
             event_type = excluded.event_type, \
             status = 'PENDING', \
             retry_at = excluded.retry_at, \
             n_retries = 0, \
             last_error = NULL, \
             content_hash = excluded.content_hash, \
             old_local_path = excluded.old_local_path, \
             old_remote_path = excluded.old_remote_path, \
             created_at = excluded.created_at \
         RETURNING id",
    )
    .bind(spec.op.to_string())
    .bind(&spec.local_path)
    .bind(&spec.remote_path)
    .bind(now)
    .bind(&spec.content_hash)
    .bind(&spec.old_local_path)
    .bind(&spec.old_remote_path)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// The due PENDING job with the smallest `retry_at`, if any.
pub async fn next_pending(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> Result<Option<SyncJob>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs \
         WHERE status = 'PENDING' AND retry_at IS NOT NULL AND retry_at <= ? \
         ORDER BY retry_at ASC, id ASC LIMIT 1"
    ))
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Earliest `retry_at` among PENDING jobs (due or deferred).
pub async fn next_retry_at(
    conn: &mut SqliteConnection,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    Ok(sqlx::query_scalar(
        "SELECT MIN(retry_at) FROM sync_jobs WHERE status = 'PENDING'",
    )
    .fetch_one(&mut *conn)
    .await?)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<SyncJob, StoreError> {
    let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM sync_jobs WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
    from_row(&row)
}

pub async fn get_by_key(
    conn: &mut SqliteConnection,
    local_path: &str,
    remote_path: &str,
) -> Result<Option<SyncJob>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {JOB_COLUMNS} FROM sync_jobs WHERE local_path = ? AND remote_path = ?"
    ))
    .bind(local_path)
    .bind(remote_path)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Lease a job for execution.
pub async fn mark_processing(conn: &mut SqliteConnection, id: i64) -> Result<(), StoreError> {
    update_one(
        conn,
        id,
        "UPDATE sync_jobs SET status = 'PROCESSING', retry_at = NULL WHERE id = ?",
    )
    .await
}

pub async fn mark_synced(conn: &mut SqliteConnection, id: i64) -> Result<(), StoreError> {
    update_one(
        conn,
        id,
        "UPDATE sync_jobs SET status = 'SYNCED', retry_at = NULL, last_error = NULL WHERE id = ?",
    )
    .await
}

pub async fn mark_blocked(
    conn: &mut SqliteConnection,
    id: i64,
    error: &str,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE sync_jobs SET status = 'BLOCKED', retry_at = NULL, last_error = ? WHERE id = ?",
    )
    .bind(error)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("job {id}")));
    }
    Ok(())
}

/// Put a failed job back in PENDING with its new retry state.
pub async fn reschedule(
    conn: &mut SqliteConnection,
    id: i64,
    n_retries: u32,
    retry_at: DateTime<Utc>,
    error: &str,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE sync_jobs SET status = 'PENDING', retry_at = ?, n_retries = ?, last_error = ? \
         WHERE id = ?",
    )
    .bind(retry_at)
    .bind(n_retries as i64)
    .bind(error)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("job {id}")));
    }
    Ok(())
}

/// Crash recovery: jobs leased by a previous process go back to PENDING,
/// due immediately.
pub async fn reset_processing(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE sync_jobs SET status = 'PENDING', retry_at = ? WHERE status = 'PROCESSING'",
    )
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn count_by_status(
    conn: &mut SqliteConnection,
    status: JobStatus,
) -> Result<i64, StoreError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM sync_jobs WHERE status = ?")
            .bind(status.to_string())
            .fetch_one(&mut *conn)
            .await?,
    )
}

/// Drop terminal SYNCED rows older than the cutoff.
pub async fn prune_synced_before(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let result =
        sqlx::query("DELETE FROM sync_jobs WHERE status = 'SYNCED' AND created_at < ?")
            .bind(cutoff)
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected())
}

async fn update_one(
    conn: &mut SqliteConnection,
    id: i64,
    sql: &str,
) -> Result<(), StoreError> {
    let result = sqlx::query(sql).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("job {id}")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
