//! # Report Module
//!
//! Collects every non-fatal condition of a run into one end-of-run report.
//!
//! ## Taxonomy
//! - `Unreadable` - a file or directory could not be read during inventory
//! - `MissingFile` - a file vanished between inventory and hashing
//! - `HashFailed` - a file could not be hashed for another reason
//! - `Anomaly` - suspicious but recoverable (extension mismatch in a
//!   duplicate group, overlay conflicts, unparseable dates)
//!
//! Nothing here interrupts the run. Conditions that need a human decision
//! are additionally surfaced as [`ReviewFlag`](crate::core::media::ReviewFlag)s
//! on the affected items.

mod export;

pub use export::{export_csv, export_json};

use crate::core::classifier::FileKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A recoverable condition noticed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    Unreadable { path: PathBuf, reason: String },
    MissingFile { path: PathBuf },
    HashFailed { path: PathBuf, reason: String },
    Anomaly(Anomaly),
}

/// Suspicious input that was handled without losing anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    /// Byte-identical files with different extensions
    ExtensionMismatch { canonical: PathBuf, duplicate: PathBuf },
    /// Several bases matched an overlay equally well
    AmbiguousOverlay { overlay: PathBuf, candidates: Vec<PathBuf> },
    /// No base matched an overlay at all
    UnmatchedOverlay { overlay: PathBuf },
    /// An earlier overlay already claimed the base
    OverlayConflict { overlay: PathBuf, base: PathBuf },
    /// No capture time could be resolved
    UnparseableTimestamp { path: PathBuf },
}

impl Warning {
    /// The file the warning is about
    pub fn path(&self) -> &Path {
        match self {
            Warning::Unreadable { path, .. }
            | Warning::MissingFile { path }
            | Warning::HashFailed { path, .. } => path,
            Warning::Anomaly(anomaly) => anomaly.path(),
        }
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, Warning::Anomaly(_))
    }
}

impl Anomaly {
    /// The file the anomaly is about
    pub fn path(&self) -> &Path {
        match self {
            Anomaly::ExtensionMismatch { duplicate, .. } => duplicate,
            Anomaly::AmbiguousOverlay { overlay, .. }
            | Anomaly::UnmatchedOverlay { overlay }
            | Anomaly::OverlayConflict { overlay, .. } => overlay,
            Anomaly::UnparseableTimestamp { path } => path,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Unreadable { path, reason } => {
                write!(f, "Skipped unreadable {}: {}", path.display(), reason)
            }
            Warning::MissingFile { path } => {
                write!(f, "File disappeared before hashing: {}", path.display())
            }
            Warning::HashFailed { path, reason } => {
                write!(f, "Could not hash {}: {}", path.display(), reason)
            }
            Warning::Anomaly(anomaly) => write!(f, "{}", anomaly),
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::ExtensionMismatch {
                canonical,
                duplicate,
            } => write!(
                f,
                "{} duplicates {} but has a different extension",
                duplicate.display(),
                canonical.display()
            ),
            Anomaly::AmbiguousOverlay {
                overlay,
                candidates,
            } => write!(
                f,
                "{} matches {} files equally well; left unpaired",
                overlay.display(),
                candidates.len()
            ),
            Anomaly::UnmatchedOverlay { overlay } => {
                write!(f, "{} has no matching photo or video", overlay.display())
            }
            Anomaly::OverlayConflict { overlay, base } => write!(
                f,
                "{} matches {}, which already has an overlay",
                overlay.display(),
                base.display()
            ),
            Anomaly::UnparseableTimestamp { path } => {
                write!(f, "No capture date found for {}", path.display())
            }
        }
    }
}

/// All warnings of one run, in the order they were recorded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub warnings: Vec<Warning>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn anomaly(&mut self, anomaly: Anomaly) {
        self.warnings.push(Warning::Anomaly(anomaly));
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        self.warnings.iter().filter_map(|w| match w {
            Warning::Anomaly(a) => Some(a),
            _ => None,
        })
    }

    pub fn missing_files(&self) -> impl Iterator<Item = &Path> {
        self.warnings.iter().filter_map(|w| match w {
            Warning::MissingFile { path } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Summary counts of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Regular files found under the root
    pub files_inventoried: usize,
    /// Files per classified kind
    pub kind_counts: BTreeMap<FileKind, usize>,
    /// Byte-identical copies listed for deletion
    pub duplicates_discarded: usize,
    /// Thumbnails listed for deletion
    pub thumbnails_discarded: usize,
    /// Overlay records seen
    pub overlays: usize,
    /// Overlays paired with a base
    pub overlays_associated: usize,
    /// Items in the final sequence
    pub items: usize,
    /// Items without a capture time
    pub undated: usize,
    /// Items carrying at least one review flag
    pub flagged: usize,
    /// Warnings and anomalies recorded
    pub warnings: usize,
    /// Bytes freed by deleting every discard
    pub bytes_reclaimable: u64,
}
