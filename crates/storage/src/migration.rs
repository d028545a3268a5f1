// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numbered schema migrations, applied monotonically at open.
//!
//! Each migration runs in its own transaction together with its
//! `schema_migrations` bookkeeping row, so a crash mid-upgrade leaves the
//! database at a well-defined version.

use sqlx::SqlitePool;
use thiserror::Error;

/// Errors that can occur while migrating the schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration v{version} ({name}) failed: {source}")]
    Failed {
        version: i64,
        name: &'static str,
        source: sqlx::Error,
    },
    #[error("database schema v{found} is newer than supported (v{supported})")]
    TooNew { found: i64, supported: i64 },
    #[error("migration bookkeeping failed: {0}")]
    Bookkeeping(#[from] sqlx::Error),
}

/// A single schema step.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All known migrations, in version order.
///
/// The job-uniqueness key is the composite `(local_path, remote_path)`;
/// enqueueing an existing key replaces the row via upsert.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial schema",
        sql: r#"
            CREATE TABLE sync_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL
                    CHECK(event_type IN ('CREATE', 'UPDATE', 'DELETE', 'RENAME', 'MOVE')),
                local_path TEXT NOT NULL,
                remote_path TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK(status IN ('PENDING', 'PROCESSING', 'SYNCED', 'BLOCKED')),
                retry_at TEXT,
                n_retries INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                content_hash TEXT,
                old_local_path TEXT,
                old_remote_path TEXT,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX idx_sync_jobs_path_key
                ON sync_jobs(local_path, remote_path);

            CREATE TABLE file_hashes (
                local_path TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE node_mapping (
                local_path TEXT NOT NULL,
                remote_path TEXT NOT NULL,
                node_uid TEXT NOT NULL,
                parent_node_uid TEXT NOT NULL,
                is_directory INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (local_path, remote_path)
            );

            CREATE INDEX idx_node_mapping_local ON node_mapping(local_path);

            CREATE TABLE clocks (
                root TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE flags (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "index pending jobs by retry_at",
        sql: r#"
            CREATE INDEX idx_sync_jobs_status_retry
                ON sync_jobs(status, retry_at);
        "#,
    },
];

/// Apply every migration newer than the recorded schema version.
/// Returns the number applied.
pub async fn apply_all(pool: &SqlitePool) -> Result<u32, MigrationError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    let current: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(pool)
            .await?;

    let supported = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
    if current > supported {
        return Err(MigrationError::TooNew {
            found: current,
            supported,
        });
    }

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;

        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|source| MigrationError::Failed {
                version: migration.version,
                name: migration.name,
                source,
            })?;

        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(version = migration.version, name = migration.name, "migrated");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
