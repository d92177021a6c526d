// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory versioned state store.
//!
//! Each deployment lineage owns a [`StateRecord`]: the live state, a bounded
//! ring of superseded versions, and an advisory lock. Every operation on one
//! id runs under that id's own mutex, so concurrent callers on different ids
//! never contend and calls on the same id are linearizable.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use stratum_core::{
    Clock, DeploymentId, DeploymentState, LockId, LockInfo, StateBackup, SystemClock,
};
use thiserror::Error;

/// Superseded versions kept per deployment; the oldest is evicted first.
pub const MAX_BACKUPS: usize = 10;

/// Errors from lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no state for deployment {0}")]
    NotFound(DeploymentId),
    #[error("state for {id} is already locked by {who} ({operation})")]
    AlreadyLocked { id: DeploymentId, who: String, operation: String },
    #[error("state for {0} is not locked")]
    NotLocked(DeploymentId),
    #[error("invalid lock id")]
    InvalidLockId,
}

/// Everything stored for one deployment id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Current state, without lock projection
    pub live: Option<DeploymentState>,
    /// Superseded versions, oldest first
    #[serde(default)]
    pub backups: VecDeque<StateBackup>,
    /// Held independently of saves; a save never releases it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockInfo>,
}

impl StateRecord {
    /// The live state as callers see it, with the lock fields filled in.
    fn projected(&self) -> Option<DeploymentState> {
        self.live.as_ref().map(|state| self.project(state.clone()))
    }

    fn project(&self, mut state: DeploymentState) -> DeploymentState {
        state.locked = self.lock.is_some();
        state.lock_info = self.lock.clone();
        state
    }

    fn push_backup(&mut self, backup: StateBackup) {
        while self.backups.len() >= MAX_BACKUPS {
            self.backups.pop_front();
        }
        self.backups.push_back(backup);
    }
}

/// Point-in-time copy of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub records: BTreeMap<DeploymentId, StateRecord>,
}

#[derive(Default)]
struct Slot {
    record: StateRecord,
    /// Set once the slot has been removed from the index by `delete_state`
    retired: bool,
}

type SlotRef = Arc<Mutex<Slot>>;

/// Versioned state store with a backup ring and advisory locks.
pub struct StateStore<C: Clock = SystemClock> {
    slots: Mutex<HashMap<DeploymentId, SlotRef>>,
    clock: C,
}

impl Default for StateStore<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> StateStore<C> {
    pub fn new(clock: C) -> Self {
        Self { slots: Mutex::new(HashMap::new()), clock }
    }

    /// Run `f` against the record for `id`, if one exists.
    fn with_record<R>(&self, id: &DeploymentId, f: impl FnOnce(&mut StateRecord) -> R) -> Option<R> {
        loop {
            let slot = self.slots.lock().get(id).cloned()?;
            let mut slot = slot.lock();
            if slot.retired {
                continue;
            }
            return Some(f(&mut slot.record));
        }
    }

    /// Run `f` against the record for `id`, creating an empty one if needed.
    fn with_record_or_insert<R>(&self, id: &DeploymentId, f: impl FnOnce(&mut StateRecord) -> R) -> R {
        loop {
            let slot = self.slots.lock().entry(id.clone()).or_default().clone();
            let mut slot = slot.lock();
            if slot.retired {
                continue;
            }
            return f(&mut slot.record);
        }
    }

    /// Write `state` as the next version for `id`.
    ///
    /// The previous live state, if any, is pushed onto the backup ring.
    /// The returned copy carries the assigned version and timestamp.
    pub fn save_state(&self, id: &DeploymentId, mut state: DeploymentState) -> DeploymentState {
        let now = self.clock.utc_now();
        let saved = self.with_record_or_insert(id, |record| {
            let version = match record.live.take() {
                Some(previous) => {
                    let version = previous.version + 1;
                    let previous = record.project(previous);
                    record.push_backup(StateBackup {
                        deployment_id: id.clone(),
                        version: previous.version,
                        state: previous,
                        created_at: now,
                    });
                    version
                }
                None => 1,
            };
            state.version = version;
            state.last_modified = now;
            state.locked = false;
            state.lock_info = None;
            let saved = record.project(state.clone());
            record.live = Some(state);
            saved
        });
        tracing::debug!(deployment_id = %id, version = saved.version, "state saved");
        saved
    }

    /// Current live state for `id`.
    pub fn get_state(&self, id: &DeploymentId) -> Option<DeploymentState> {
        self.with_record(id, |record| record.projected()).flatten()
    }

    /// The live state when `version` is `None`, otherwise the backed-up
    /// state with exactly that version.
    pub fn get_state_version(&self, id: &DeploymentId, version: Option<u64>) -> Option<DeploymentState> {
        self.with_record(id, |record| match version {
            None => record.projected(),
            Some(v) => record.backups.iter().find(|b| b.version == v).map(|b| b.state.clone()),
        })
        .flatten()
    }

    /// Up to `limit` backups for `id`, newest version first.
    pub fn get_state_history(&self, id: &DeploymentId, limit: usize) -> Vec<StateBackup> {
        self.with_record(id, |record| {
            record.backups.iter().rev().take(limit).cloned().collect::<Vec<_>>()
        })
        .unwrap_or_default()
    }

    /// Take the advisory lock for `id`.
    ///
    /// Advisory only: `save_state` does not check it.
    pub fn lock_state(
        &self,
        id: &DeploymentId,
        operation: impl Into<String>,
        who: impl Into<String>,
    ) -> Result<LockId, StateError> {
        let now = self.clock.utc_now();
        let (operation, who) = (operation.into(), who.into());
        let result = self
            .with_record(id, |record| {
                if record.live.is_none() {
                    return Err(StateError::NotFound(id.clone()));
                }
                if let Some(held) = &record.lock {
                    return Err(StateError::AlreadyLocked {
                        id: id.clone(),
                        who: held.who.clone(),
                        operation: held.operation.clone(),
                    });
                }
                let lock_id = LockId::new();
                record.lock = Some(LockInfo { id: lock_id.clone(), operation, who, created: now });
                Ok(lock_id)
            })
            .unwrap_or_else(|| Err(StateError::NotFound(id.clone())));
        if let Ok(lock_id) = &result {
            tracing::debug!(deployment_id = %id, lock_id = %lock_id, "state locked");
        }
        result
    }

    /// Release the lock on `id`; `lock_id` must match the holder.
    pub fn unlock_state(&self, id: &DeploymentId, lock_id: &str) -> Result<(), StateError> {
        self.with_record(id, |record| {
            if record.live.is_none() {
                return Err(StateError::NotFound(id.clone()));
            }
            match &record.lock {
                None => Err(StateError::NotLocked(id.clone())),
                Some(held) if held.id != lock_id => Err(StateError::InvalidLockId),
                Some(_) => {
                    record.lock = None;
                    Ok(())
                }
            }
        })
        .unwrap_or_else(|| Err(StateError::NotFound(id.clone())))?;
        tracing::debug!(deployment_id = %id, "state unlocked");
        Ok(())
    }

    /// Remove the live state, the backups and the lock for `id`.
    ///
    /// Returns whether anything was removed.
    pub fn delete_state(&self, id: &DeploymentId) -> bool {
        let Some(slot) = self.slots.lock().remove(id) else {
            return false;
        };
        let mut slot = slot.lock();
        slot.retired = true;
        let existed = slot.record.live.is_some();
        slot.record = StateRecord::default();
        if existed {
            tracing::debug!(deployment_id = %id, "state deleted");
        }
        existed
    }

    /// Ids with a live state, in sorted order.
    pub fn ids(&self) -> Vec<DeploymentId> {
        let slots: Vec<(DeploymentId, SlotRef)> =
            self.slots.lock().iter().map(|(id, slot)| (id.clone(), slot.clone())).collect();
        let mut ids: Vec<DeploymentId> = slots
            .into_iter()
            .filter(|(_, slot)| {
                let slot = slot.lock();
                !slot.retired && slot.record.live.is_some()
            })
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Copy every record out of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let slots: Vec<(DeploymentId, SlotRef)> =
            self.slots.lock().iter().map(|(id, slot)| (id.clone(), slot.clone())).collect();
        let records = slots
            .into_iter()
            .filter_map(|(id, slot)| {
                let slot = slot.lock();
                (!slot.retired && slot.record.live.is_some()).then(|| (id, slot.record.clone()))
            })
            .collect();
        StoreSnapshot { records }
    }

    /// Replace the store's contents with `snapshot`.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut slots = self.slots.lock();
        for slot in slots.values() {
            slot.lock().retired = true;
        }
        *slots = snapshot
            .records
            .into_iter()
            .map(|(id, record)| (id, Arc::new(Mutex::new(Slot { record, retired: false }))))
            .collect();
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
