// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification and retry backoff policy.
//!
//! Failures from the remote are classified by inspecting the error message.
//! Network failures retry forever with a capped delay; everything else
//! walks the standard schedule and blocks the job when it runs out.
//! Classification is string-based for fidelity with the remote client's
//! error surface; both the classifier and the jitter source are injectable
//! so callers can swap in tagged-error matching or deterministic tests
//! without touching the schedule.

use rand::Rng;
use std::time::Duration;

/// Standard retry schedule in seconds, indexed by `min(n_retries - 1, len - 1)`.
pub const RETRY_SCHEDULE_SECS: [u64; 11] = [
    1, 4, 16, 64, 256, 1024, 4096, 16384, 65536, 262144, 604800,
];

/// Attempt count at which bounded categories transition to `Blocked`.
pub const MAX_RETRIES: u32 = 11;

/// Network retry counters stop growing here so the delay never exceeds
/// the capped schedule entry.
pub const NETWORK_RETRY_CAP: u32 = 6;

/// Highest schedule index used for network failures (256 s).
pub const NETWORK_DELAY_INDEX_CAP: usize = 4;

/// Prior-attempt count after which a reupload-needed failure is healed
/// with delete + create instead of a plain retry.
pub const REUPLOAD_HEAL_THRESHOLD: u32 = 2;

/// Uniform jitter applied to every delay, as a fraction of the base.
const JITTER_FRACTION: f64 = 0.25;

const MIN_DELAY: Duration = Duration::from_secs(1);

const NETWORK_MARKERS: &[&str] = &[
    "econnrefused",
    "econnreset",
    "etimedout",
    "enotfound",
    "eai_again",
    "enetunreach",
    "ehostunreach",
    "socket hang up",
    "network",
    "timeout",
    "connection",
];

const REUPLOAD_MARKERS: &[&str] = &[
    "stale node",
    "corrupt node",
    "missing revision",
    "reupload",
];

/// How a remote failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient transport failure. Retried forever.
    Network,
    /// The cached node identity no longer refers to a valid remote node.
    /// Healed with delete + create after repeated failures.
    ReuploadNeeded,
    /// Everything else. Retried on the standard schedule, then blocked.
    Other,
}

/// Classify an error message by substring matching, case-insensitive.
pub fn classify_error(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorCategory::Network;
    }
    if REUPLOAD_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorCategory::ReuploadNeeded;
    }
    ErrorCategory::Other
}

/// Outcome of applying the policy to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reschedule with the new retry counter after the given delay.
    Retry { n_retries: u32, delay: Duration },
    /// Retries exhausted; the job transitions to `Blocked`.
    Block,
}

type ClassifyFn = fn(&str) -> ErrorCategory;
type JitterFn = fn() -> f64;

fn random_jitter() -> f64 {
    rand::rng().random_range(-JITTER_FRACTION..=JITTER_FRACTION)
}

/// Backoff policy with injectable classifier and jitter source.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    classify: ClassifyFn,
    jitter: JitterFn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            classify: classify_error,
            jitter: random_jitter,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy without jitter, for deterministic tests.
    pub fn without_jitter() -> Self {
        Self {
            classify: classify_error,
            jitter: || 0.0,
        }
    }

    /// Replace the classifier (e.g. to match tagged error variants).
    pub fn with_classifier(mut self, classify: ClassifyFn) -> Self {
        self.classify = classify;
        self
    }

    pub fn classify(&self, message: &str) -> ErrorCategory {
        (self.classify)(message)
    }

    /// Decide what to do after a failure, given the retry counter stored
    /// on the job before this attempt.
    pub fn on_failure(&self, prior_retries: u32, message: &str) -> RetryDecision {
        self.decide(self.classify(message), prior_retries)
    }

    /// Decision for an already-classified failure.
    pub fn decide(&self, category: ErrorCategory, prior_retries: u32) -> RetryDecision {
        match category {
            ErrorCategory::Network => {
                let n_retries = (prior_retries + 1).min(NETWORK_RETRY_CAP);
                let idx = (n_retries.saturating_sub(1) as usize).min(NETWORK_DELAY_INDEX_CAP);
                RetryDecision::Retry {
                    n_retries,
                    delay: self.jittered(RETRY_SCHEDULE_SECS[idx]),
                }
            }
            ErrorCategory::ReuploadNeeded | ErrorCategory::Other => {
                let n_retries = prior_retries + 1;
                if n_retries >= MAX_RETRIES {
                    return RetryDecision::Block;
                }
                let idx =
                    (n_retries.saturating_sub(1) as usize).min(RETRY_SCHEDULE_SECS.len() - 1);
                RetryDecision::Retry {
                    n_retries,
                    delay: self.jittered(RETRY_SCHEDULE_SECS[idx]),
                }
            }
        }
    }

    /// True once a reupload-needed job has failed often enough to attempt
    /// delete + create healing.
    pub fn should_heal(&self, prior_retries: u32) -> bool {
        prior_retries >= REUPLOAD_HEAL_THRESHOLD
    }

    fn jittered(&self, base_secs: u64) -> Duration {
        let factor = 1.0 + (self.jitter)();
        let secs = (base_secs as f64 * factor).max(0.0);
        Duration::from_secs_f64(secs).max(MIN_DELAY)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
