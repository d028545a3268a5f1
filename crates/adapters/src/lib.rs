// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the engine's external collaborators.
//!
//! The sync engine consumes two capability interfaces: the filesystem
//! watcher (batched change events) and the remote drive client (node
//! operations on the encrypted cloud tree). Production implementations
//! live outside this repository; the fakes here drive the engine in tests.

pub mod remote;
pub mod watcher;

pub use remote::{
    NodeKind, NodeOutcome, NoOpRemote, RelocateRequest, RemoteAdapter, RemoteChild, RemoteError,
};
pub use watcher::{NoOpWatcher, WatcherAdapter, WatcherError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemote, RemoteCall};
#[cfg(any(test, feature = "test-support"))]
pub use watcher::{FakeWatcher, WatcherCall};
