//! Types for the apply module.

use crate::core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

/// A single filesystem change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    /// Copy or move a kept file into the destination tree
    Place {
        source: PathBuf,
        destination: PathBuf,
        /// Capture time to stamp as the modification time
        capture_time: Option<Timestamp>,
        size_bytes: u64,
    },
    /// Remove a discarded file from the export
    Delete { path: PathBuf, size_bytes: u64 },
}

impl ApplyAction {
    /// The file this action reads or removes
    pub fn source(&self) -> &Path {
        match self {
            ApplyAction::Place { source, .. } => source,
            ApplyAction::Delete { path, .. } => path,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            ApplyAction::Place { size_bytes, .. } | ApplyAction::Delete { size_bytes, .. } => {
                *size_bytes
            }
        }
    }
}

/// An action that could not be carried out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of executing (or previewing) a list of actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub dry_run: bool,
    /// Actions that succeeded, or would succeed in a dry run
    pub completed: Vec<ApplyAction>,
    pub failures: Vec<ApplyFailure>,
    pub files_placed: usize,
    pub files_deleted: usize,
    pub folders_created: usize,
    pub folders_removed: usize,
    pub total_size_bytes: u64,
    pub duration_ms: u64,
}

impl ApplyOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
