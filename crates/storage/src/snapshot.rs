// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable snapshots of the state store.
//!
//! Format: zstd-compressed JSON `{"v": 1, "state": {...}}`. Writes go to a
//! sibling temp file which is then renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.

use crate::store::{StateStore, StoreSnapshot};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use stratum_core::Clock;
use thiserror::Error;

/// Snapshot format version written by this build.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot is missing its version field")]
    MissingVersion,
    #[error("snapshot version {0} is newer than supported version {1}")]
    TooNew(u32, u32),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    state: StoreSnapshot,
}

/// Write `snapshot` to `path`.
pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), SnapshotError> {
    let envelope = Envelope { v: CURRENT_SNAPSHOT_VERSION, state: snapshot.clone() };
    let json = serde_json::to_vec(&envelope)?;
    let compressed = zstd::stream::encode_all(json.as_slice(), ZSTD_LEVEL)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, &compressed)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(
        path = %path.display(),
        records = snapshot.records.len(),
        bytes = compressed.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Read the snapshot at `path`; `Ok(None)` if no snapshot exists yet.
pub fn load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>, SnapshotError> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let json = zstd::stream::decode_all(compressed.as_slice())?;
    let value: serde_json::Value = serde_json::from_slice(&json)?;

    let version = value
        .get("v")
        .and_then(serde_json::Value::as_u64)
        .ok_or(SnapshotError::MissingVersion)?;
    let version = u32::try_from(version).unwrap_or(u32::MAX);
    if version > CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::TooNew(version, CURRENT_SNAPSHOT_VERSION));
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    Ok(Some(envelope.state))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl<C: Clock> StateStore<C> {
    /// Persist the whole store to `path`.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        save_snapshot(path, &self.snapshot())
    }

    /// Replace the store's contents from `path`.
    ///
    /// Returns `false`, leaving the store untouched, if no snapshot exists.
    pub fn load_snapshot(&self, path: &Path) -> Result<bool, SnapshotError> {
        match load_snapshot(path)? {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
