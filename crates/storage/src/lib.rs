// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for drift.
//!
//! All durable engine state lives in one SQLite database file. Entity
//! operations take a `&mut SqliteConnection` so they compose freely into
//! transactions; the engine's atomicity units (one translator batch, one
//! executor outcome) are transactions opened by the caller.

pub mod clocks;
pub mod flags;
pub mod hashes;
pub mod jobs;
pub mod mappings;
mod migration;
pub mod signals;

pub use mappings::NodeMapping;
pub use migration::{Migration, MigrationError, MIGRATIONS};
pub use signals::Signal;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient database error: {0}")]
    Transient(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
            let code = db.code().unwrap_or_default();
            // SQLITE_BUSY (5) and SQLITE_IOERR (10) are retryable
            if code == "5" || code == "10" {
                return StoreError::Transient(db.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

impl From<drift_core::job::ParseFieldError> for StoreError {
    fn from(e: drift_core::job::ParseFieldError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Handle to the sync database.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `path` and bring the
    /// schema up to date.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Transient(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let applied = migration::apply_all(&pool).await?;
        if applied > 0 {
            tracing::info!(applied, db = %path.display(), "applied schema migrations");
        }

        Ok(Self { pool })
    }

    /// In-memory store for tests. A single connection keeps every caller
    /// on the same database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        migration::apply_all(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a serializable transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    /// Check out a connection for single-statement operations.
    pub async fn acquire(
        &self,
    ) -> Result<sqlx::pool::PoolConnection<Sqlite>, StoreError> {
        Ok(self.pool.acquire().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
