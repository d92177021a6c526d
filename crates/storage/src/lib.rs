// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Versioned infrastructure state storage for stratum

mod snapshot;
mod store;

pub use snapshot::{load_snapshot, save_snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use store::{StateError, StateRecord, StateStore, StoreSnapshot, MAX_BACKUPS};
