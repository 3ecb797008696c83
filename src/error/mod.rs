//! # Error Module
//!
//! Error types for the export reconciler.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Only inaccessible input is fatal** - everything else becomes a
//!   [`Warning`](crate::core::report::Warning) in the run report
//! - **Include context** - paths, stage names, what went wrong

use crate::core::pipeline::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),

    /// A fatal error that halted the pipeline in a specific stage.
    #[error("Pipeline halted during {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    /// Wrap an error with the stage it halted.
    pub fn in_stage(stage: Stage, source: impl Into<ReconcileError>) -> Self {
        ReconcileError::Stage {
            stage,
            source: Box::new(source.into()),
        }
    }

    /// The stage that failed, if this error halted the pipeline
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            ReconcileError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Errors that occur while building the file inventory
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Export root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Export root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied reading export root: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read export root {path}: {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors in the configuration surface
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field} pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors while fingerprinting file content
#[derive(Error, Debug)]
pub enum HashError {
    /// The file vanished between inventory and hashing.
    #[error("File disappeared before it could be hashed: {path}")]
    Missing { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start hashing workers: {0}")]
    WorkerPool(String),
}

/// Errors while applying a plan to the filesystem
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Destination {path} is inside the export root")]
    DestinationInsideRoot { path: PathBuf },

    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ReconcileError>;
