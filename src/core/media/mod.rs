//! # Media Module
//!
//! The units handed downstream: reconciled [`MediaItem`]s and the
//! [`Discard`] list of files the apply step may delete.

use crate::core::inventory::FileRecord;
use crate::core::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Destination category of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Photo,
    Video,
    VoiceMemo,
    /// An overlay that could not be paired with a base
    Overlay,
}

impl Category {
    /// Top-level folder for this category
    pub fn folder_name(&self) -> &'static str {
        match self {
            Category::Photo => "Photos",
            Category::Video => "Videos",
            Category::VoiceMemo => "Voice Memos",
            Category::Overlay => "Unpaired Overlays",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Photo => write!(f, "Photo"),
            Category::Video => write!(f, "Video"),
            Category::VoiceMemo => write!(f, "Voice Memo"),
            Category::Overlay => write!(f, "Overlay"),
        }
    }
}

/// Where an item's capture time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    BaseFilename,
    OverlayFilename,
    EmbeddedExif,
    /// Lowest confidence
    ModifiedTime,
}

/// Something a human should look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewFlag {
    /// No capture time could be resolved
    NeedsManualDate,
    /// Overlay emitted on its own because no unique base matched
    UnassociatedOverlay,
    /// Overlay lost a base to an earlier overlay
    OverlayConflict,
    /// Capture time came from the file modification time
    LowConfidenceDate,
}

impl ReviewFlag {
    pub fn description(&self) -> &'static str {
        match self {
            ReviewFlag::NeedsManualDate => "No capture date found",
            ReviewFlag::UnassociatedOverlay => "Overlay without a matching photo or video",
            ReviewFlag::OverlayConflict => "Another overlay already claimed this photo or video",
            ReviewFlag::LowConfidenceDate => "Date taken from file modification time",
        }
    }
}

/// A reconciled base file with its optional overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// The canonical record (the overlay itself for overlay-only items)
    pub base: FileRecord,
    pub overlay: Option<FileRecord>,
    pub capture_time: Option<Timestamp>,
    pub time_source: Option<TimeSource>,
    pub category: Category,
    pub flags: Vec<ReviewFlag>,
}

impl MediaItem {
    /// An item with no overlay and no capture time yet
    pub fn new(base: FileRecord, category: Category) -> Self {
        Self {
            base,
            overlay: None,
            capture_time: None,
            time_source: None,
            category,
            flags: Vec::new(),
        }
    }

    /// Add a review flag once
    pub fn flag(&mut self, flag: ReviewFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    pub fn has_flag(&self, flag: ReviewFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn needs_review(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Paths of every file this item carries
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.base.path.as_path())
            .chain(self.overlay.as_ref().map(|o| o.path.as_path()))
    }

    /// Total bytes across base and overlay
    pub fn size_bytes(&self) -> u64 {
        self.base.size_bytes + self.overlay.as_ref().map_or(0, |o| o.size_bytes)
    }
}

/// Why a file is listed for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Byte-identical to the canonical record
    Duplicate { canonical: PathBuf },
    Thumbnail,
}

/// A file the apply step may delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discard {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub reason: DiscardReason,
}

impl Discard {
    pub fn duplicate(record: &FileRecord, canonical: &Path) -> Self {
        Self {
            path: record.path.clone(),
            size_bytes: record.size_bytes,
            reason: DiscardReason::Duplicate {
                canonical: canonical.to_path_buf(),
            },
        }
    }

    pub fn thumbnail(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size_bytes: record.size_bytes,
            reason: DiscardReason::Thumbnail,
        }
    }
}
