//! # Inventory Module
//!
//! Walks an extracted export tree and records every regular file.
//!
//! Nothing is filtered here: hidden files, sidecars and thumbnails are all
//! inventoried so the classifier can make every keep/drop decision from one
//! rule table. Symlinks are never followed.
//!
//! ISO media containers get their track layout read once here, so the
//! classifier can tell a silent-picture voice memo from a video clip.
//!
//! ## Example
//! ```rust,ignore
//! use media_export_reconciler::core::inventory::InventoryBuilder;
//!
//! let inventory = InventoryBuilder::new().build("/tmp/export".as_ref())?;
//! println!("{} files", inventory.records.len());
//! ```

mod walker;

pub use walker::InventoryBuilder;

use crate::core::classifier::FileKind;
use crate::core::report::Warning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A single file found in the export tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Lowercased extension without the dot (empty if none)
    pub extension: String,
    /// Filename exactly as it appears on disk
    pub raw_filename: String,
    /// Last modified time
    pub modified: SystemTime,
    /// Assigned by the classifier
    pub kind: FileKind,
    /// For ISO media containers, whether a video track is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_video_track: Option<bool>,
}

impl FileRecord {
    /// Build a record for `path` from already-read metadata
    pub fn new(path: PathBuf, size_bytes: u64, modified: SystemTime) -> Self {
        let raw_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&path);

        Self {
            path,
            size_bytes,
            extension,
            raw_filename,
            modified,
            kind: FileKind::Unclassified,
            has_video_track: None,
        }
    }

    /// Filename without its final extension
    pub fn stem(&self) -> &str {
        match self.raw_filename.rfind('.') {
            Some(idx) if idx > 0 => &self.raw_filename[..idx],
            _ => &self.raw_filename,
        }
    }

    /// Copy of this record carrying `kind`
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = kind;
        self
    }

    /// Copy of this record with a known container layout
    pub fn with_video_track(mut self, has_video_track: Option<bool>) -> Self {
        self.has_video_track = has_video_track;
        self
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Output of the inventory stage
#[derive(Debug, Default)]
pub struct Inventory {
    /// Every readable regular file, keyed by path
    pub records: BTreeMap<PathBuf, FileRecord>,
    /// Files or directories that could not be read (non-fatal)
    pub warnings: Vec<Warning>,
}

impl Inventory {
    /// Total bytes across all inventoried files
    pub fn total_bytes(&self) -> u64 {
        self.records.values().map(|r| r.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> FileRecord {
        FileRecord::new(PathBuf::from("/export").join(name), 10, SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(record("IMG_1234.JPG").extension, "jpg");
    }

    #[test]
    fn raw_filename_is_verbatim() {
        assert_eq!(record("Snap_Memory.JPG").raw_filename, "Snap_Memory.JPG");
    }

    #[test]
    fn missing_extension_is_empty() {
        let r = record("README");
        assert_eq!(r.extension, "");
        assert_eq!(r.stem(), "README");
    }

    #[test]
    fn stem_strips_only_last_extension() {
        assert_eq!(record("clip.overlay.png").stem(), "clip.overlay");
        assert_eq!(record(".hidden").stem(), ".hidden");
    }

    #[test]
    fn new_record_is_unclassified() {
        assert_eq!(record("a.jpg").kind, FileKind::Unclassified);
        assert_eq!(record("a.jpg").with_kind(FileKind::Media).kind, FileKind::Media);
    }
}
