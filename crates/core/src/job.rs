// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync job model and state machine.
//!
//! A job is one logical remote operation derived from local filesystem
//! changes. Jobs are keyed by `(local_path, remote_path)`: enqueueing the
//! same key again replaces the previous job (latest wins, retry counter
//! reset). Jobs end in `Synced` or `Blocked`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Logical remote operation carried by a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOp {
    Create,
    Update,
    Delete,
    Rename,
    Move,
}

impl SyncOp {
    /// True for operations that relocate an existing remote node and
    /// therefore carry `old_local_path` / `old_remote_path`.
    pub fn is_relocation(&self) -> bool {
        matches!(self, SyncOp::Rename | SyncOp::Move)
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOp::Create => write!(f, "CREATE"),
            SyncOp::Update => write!(f, "UPDATE"),
            SyncOp::Delete => write!(f, "DELETE"),
            SyncOp::Rename => write!(f, "RENAME"),
            SyncOp::Move => write!(f, "MOVE"),
        }
    }
}

/// Error parsing a stored job field back into its enum form.
#[derive(Debug, Error)]
#[error("unrecognized {field}: {value}")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub value: String,
}

impl FromStr for SyncOp {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(SyncOp::Create),
            "UPDATE" => Ok(SyncOp::Update),
            "DELETE" => Ok(SyncOp::Delete),
            "RENAME" => Ok(SyncOp::Rename),
            "MOVE" => Ok(SyncOp::Move),
            other => Err(ParseFieldError {
                field: "event_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting for execution (or for `retry_at` to elapse).
    Pending,
    /// Leased by the executor pool.
    Processing,
    /// Terminal: the remote reflects this change.
    Synced,
    /// Terminal: retries exhausted, operator intervention needed.
    Blocked,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Synced | JobStatus::Blocked)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Synced => write!(f, "SYNCED"),
            JobStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "SYNCED" => Ok(JobStatus::Synced),
            "BLOCKED" => Ok(JobStatus::Blocked),
            other => Err(ParseFieldError {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// A persisted sync job row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub id: i64,
    pub op: SyncOp,
    pub local_path: String,
    pub remote_path: String,
    pub status: JobStatus,
    pub retry_at: Option<DateTime<Utc>>,
    pub n_retries: u32,
    pub last_error: Option<String>,
    /// SHA-1 of the content the job propagates. `None` for DELETE and for
    /// directory CREATEs.
    pub content_hash: Option<String>,
    pub old_local_path: Option<String>,
    pub old_remote_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Parameters for enqueueing a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub op: SyncOp,
    pub local_path: String,
    pub remote_path: String,
    pub content_hash: Option<String>,
    pub old_local_path: Option<String>,
    pub old_remote_path: Option<String>,
}

impl JobSpec {
    pub fn create(
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        content_hash: Option<String>,
    ) -> Self {
        Self {
            op: SyncOp::Create,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            content_hash,
            old_local_path: None,
            old_remote_path: None,
        }
    }

    pub fn update(
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            op: SyncOp::Update,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            content_hash: Some(content_hash.into()),
            old_local_path: None,
            old_remote_path: None,
        }
    }

    pub fn delete(local_path: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            op: SyncOp::Delete,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            content_hash: None,
            old_local_path: None,
            old_remote_path: None,
        }
    }

    /// RENAME or MOVE of an already-mapped node.
    pub fn relocation(
        op: SyncOp,
        old_local_path: impl Into<String>,
        old_remote_path: impl Into<String>,
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        content_hash: Option<String>,
    ) -> Self {
        Self {
            op,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            content_hash,
            old_local_path: Some(old_local_path.into()),
            old_remote_path: Some(old_remote_path.into()),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
