// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-to-remote path mapping.
//!
//! All mapped paths are POSIX-style forward-slash strings. A local path is
//! the watched root joined with the event's relative name. The remote path
//! mirrors the tree under `<remote_prefix>/<root basename>/`, with an empty
//! prefix collapsing to `<root basename>/`.

use std::path::Path;

/// Remote path prefixes recognized as synonyms for the drive root.
const REMOTE_ROOT_SYNONYMS: &[&str] = &["./my_files/", "my_files/"];

/// Local path for an event: watched root joined with the relative name.
pub fn local_path_for(root: &Path, name: &str) -> String {
    let root = root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if name.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, name)
    }
}

/// Remote path for an event per the mapping rules.
pub fn remote_path_for(root: &Path, remote_prefix: &str, name: &str) -> String {
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = remote_prefix.trim_matches('/');
    let mut path = if prefix.is_empty() {
        dir_name
    } else {
        format!("{}/{}", prefix, dir_name)
    };
    if !name.is_empty() {
        path.push('/');
        path.push_str(name);
    }
    path
}

/// Strip a recognized root synonym from the front of a remote path.
///
/// `my_files/photos/a.jpg` and `./my_files/photos/a.jpg` both traverse
/// from the drive root at `photos/a.jpg`.
pub fn strip_remote_root(path: &str) -> &str {
    for synonym in REMOTE_ROOT_SYNONYMS {
        if let Some(rest) = path.strip_prefix(synonym) {
            return rest;
        }
    }
    path
}

/// Parent portion of a slash path, empty when there is none.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final component of a slash path.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// True when `candidate` lies strictly below `parent` (never equal).
pub fn is_strictly_under(parent: &str, candidate: &str) -> bool {
    candidate.len() > parent.len() + 1
        && candidate.starts_with(parent)
        && candidate.as_bytes()[parent.len()] == b'/'
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
