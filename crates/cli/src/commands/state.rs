// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `stratum state`: inspect and edit a saved state store snapshot.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use stratum_core::{DeploymentId, DeploymentState, LockId, StateBackup};
use stratum_storage::StateStore;

use crate::exit_error::ExitError;
use crate::output::{emit, format_history, format_state, OutputFormat};

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Show the live state, or a backed-up version
    Show {
        id: String,
        #[arg(long)]
        version: Option<u64>,
    },
    /// List backups, newest first
    History {
        id: String,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Take the advisory lock
    Lock {
        id: String,
        /// Label for the operation holding the lock
        #[arg(long)]
        operation: String,
        #[arg(long)]
        who: String,
    },
    /// Release the advisory lock
    Unlock { id: String, lock_id: String },
    /// Delete the state, its backups and its lock
    Delete { id: String },
    /// List ids with a live state
    List {},
}

impl StateCommand {
    /// Whether the command changes the store.
    fn mutates(&self) -> bool {
        matches!(self, Self::Lock { .. } | Self::Unlock { .. } | Self::Delete { .. })
    }
}

/// Result of one state command.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Reply {
    State(DeploymentState),
    History(Vec<StateBackup>),
    Locked {
        #[serde(rename = "lockId")]
        lock_id: LockId,
    },
    Done {
        ok: bool,
    },
    Ids(Vec<DeploymentId>),
}

impl Reply {
    fn render(&self) -> String {
        match self {
            Reply::State(state) => format_state(state),
            Reply::History(history) => format_history(history),
            Reply::Locked { lock_id } => format!("{}\n", lock_id),
            Reply::Done { .. } => "ok\n".to_string(),
            Reply::Ids(ids) => ids.iter().map(|id| format!("{}\n", id)).collect(),
        }
    }
}

/// Run `command` against `store`.
pub fn execute<C: stratum_core::Clock>(
    store: &StateStore<C>,
    command: &StateCommand,
) -> Result<Reply, ExitError> {
    match command {
        StateCommand::Show { id, version } => {
            let id = DeploymentId::from_string(id.as_str());
            store.get_state_version(&id, *version).map(Reply::State).ok_or_else(|| match version {
                Some(v) => ExitError::failed(format!("no state version {} for {}", v, id)),
                None => ExitError::failed(format!("no state for {}", id)),
            })
        }
        StateCommand::History { id, limit } => {
            let id = DeploymentId::from_string(id.as_str());
            Ok(Reply::History(store.get_state_history(&id, *limit)))
        }
        StateCommand::Lock { id, operation, who } => {
            let id = DeploymentId::from_string(id.as_str());
            store
                .lock_state(&id, operation.as_str(), who.as_str())
                .map(|lock_id| Reply::Locked { lock_id })
                .map_err(|e| ExitError::failed(e.to_string()))
        }
        StateCommand::Unlock { id, lock_id } => {
            let id = DeploymentId::from_string(id.as_str());
            store
                .unlock_state(&id, lock_id)
                .map(|()| Reply::Done { ok: true })
                .map_err(|e| ExitError::failed(e.to_string()))
        }
        StateCommand::Delete { id } => {
            let id = DeploymentId::from_string(id.as_str());
            if store.delete_state(&id) {
                Ok(Reply::Done { ok: true })
            } else {
                Err(ExitError::failed(format!("no state for {}", id)))
            }
        }
        StateCommand::List {} => Ok(Reply::Ids(store.ids())),
    }
}

pub fn handle(command: &StateCommand, state_file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let Some(path) = state_file else {
        return Err(ExitError::invalid("state commands need --state-file").into());
    };
    let store = StateStore::default();
    if !store.load_snapshot(path)? {
        tracing::debug!(path = %path.display(), "no snapshot yet, starting empty");
    }

    let reply = execute(&store, command)?;
    if command.mutates() {
        store.save_snapshot(path)?;
    }
    emit(&reply, format, Reply::render)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
