//! # Core Module
//!
//! The UI-agnostic reconciliation engine.
//!
//! ## Modules
//! - `inventory` - Records every file under an export root
//! - `container` - Reads the track layout of ISO media files
//! - `classifier` - Tags files by kind with an ordered rule table
//! - `fingerprint` - Streams file content into dedup keys
//! - `dedup` - Collapses byte-identical media
//! - `associate` - Pairs overlays with their base media
//! - `timestamp` - Parses capture times out of filenames
//! - `patterns` - Summarizes filename shapes per directory
//! - `reconcile` - Resolves each item's capture time
//! - `pipeline` - Orchestrates the full workflow
//! - `report` - Warnings, anomalies and summary counts
//! - `apply` - Carries a plan out on the filesystem
//! - `config` - The option surface

pub mod apply;
pub mod associate;
pub mod classifier;
pub mod config;
pub mod container;
pub mod dedup;
pub mod fingerprint;
pub mod inventory;
pub mod media;
pub mod patterns;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod timestamp;

// Re-export commonly used types
pub use classifier::FileKind;
pub use config::{CompiledConfig, ReconcileConfig};
pub use inventory::FileRecord;
pub use media::{Category, Discard, MediaItem, ReviewFlag};
pub use pipeline::{Pipeline, ReconciliationPlan, Stage};
pub use report::{Anomaly, PlanSummary, RunReport, Warning};
pub use timestamp::Timestamp;
