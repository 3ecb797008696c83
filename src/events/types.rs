//! Event type definitions for progress reporting.

use crate::core::pipeline::Stage;
use crate::core::report::PlanSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the reconciliation pipeline and apply step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Inventory walk events
    Inventory(InventoryEvent),
    /// Content hashing events
    Hash(HashEvent),
    /// Overlay association events
    Associate(AssociateEvent),
    /// Capture time reconciliation events
    Reconcile(ReconcileEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
    /// Apply step events
    Apply(ApplyEvent),
}

/// Events while walking the export tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// Walking has started
    Started { root: PathBuf },
    /// Progress update during the walk
    Progress(InventoryProgress),
    /// An entry could not be read and was skipped
    Skipped { path: PathBuf, message: String },
    /// Walking completed
    Completed { total_files: usize },
}

/// Progress information during the walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryProgress {
    /// Number of files recorded so far
    pub files_found: usize,
    /// Most recent file recorded
    pub current_path: PathBuf,
}

/// Events during content hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_files: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// A file could not be hashed; hashing continues
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed {
        total_hashed: usize,
        duplicate_groups: usize,
    },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of files hashed so far
    pub completed: usize,
    /// Total number of files to hash
    pub total: usize,
    /// File just hashed
    pub current_path: PathBuf,
}

/// Events during overlay association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssociateEvent {
    Started { overlays: usize, bases: usize },
    /// An overlay was paired with a base
    Associated { overlay: PathBuf, base: PathBuf },
    /// An overlay will be emitted on its own
    Unassociated { overlay: PathBuf, reason: String },
    Completed {
        associated: usize,
        unassociated: usize,
    },
}

/// Events during capture time reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconcileEvent {
    Started { total_items: usize },
    /// No capture time found for an item
    Undated { path: PathBuf },
    Completed { dated: usize, undated: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new stage
    StageChanged { stage: Stage },
    /// Pipeline completed successfully
    Completed { summary: PlanSummary },
    /// Pipeline halted on a fatal error
    Failed { stage: Stage, message: String },
}

/// Events while applying a plan to the filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApplyEvent {
    Started { total_actions: usize, dry_run: bool },
    Progress(ApplyProgress),
    /// An action failed; the rest continue
    Error { path: PathBuf, message: String },
    Completed {
        succeeded: usize,
        failed: usize,
        directories_removed: usize,
    },
}

/// Progress information while applying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
}
