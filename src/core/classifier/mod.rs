//! # Classifier Module
//!
//! Tags every inventoried file with a [`FileKind`] using an ordered rule
//! table. The first matching [`Rule`] wins; a file no rule claims is
//! `Unwanted`, so unrecognized files are dropped rather than silently kept.
//!
//! | Order | Rule                | Kind            |
//! |-------|---------------------|-----------------|
//! | 1     | unwanted extension  | `unwanted`      |
//! | 2     | thumbnail name      | `thumbnail`     |
//! | 3     | image overlay name  | `overlay-image` |
//! | 4     | video overlay name  | `overlay-video` |
//! | 5     | voice memo          | `voice-memo`    |
//! | 6     | image/video type    | `media`         |
//! | -     | anything else       | `unwanted`      |
//!
//! A file with a video extension is a voice memo when its container holds
//! no video track, whatever its name. Audio extensions need the voice memo
//! name.

mod rules;

pub use rules::{Rule, DEFAULT_RULES};

use crate::core::config::CompiledConfig;
use crate::core::inventory::{FileRecord, Inventory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// What a file is, as far as the pipeline is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    /// Not yet classified
    Unclassified,
    /// Sidecars and unrecognized files; dropped
    Unwanted,
    /// Preview images; dropped and listed for deletion
    Thumbnail,
    /// Caption/sticker layer for a still image
    OverlayImage,
    /// Caption/sticker layer for a video
    OverlayVideo,
    /// Audio-only recording
    VoiceMemo,
    /// A photo or video
    Media,
}

impl FileKind {
    /// Whether this kind takes part in deduplication
    pub fn is_dedup_candidate(&self) -> bool {
        matches!(self, FileKind::Media | FileKind::VoiceMemo)
    }

    /// Whether this kind is a caption layer awaiting a base
    pub fn is_overlay(&self) -> bool {
        matches!(self, FileKind::OverlayImage | FileKind::OverlayVideo)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Unclassified => write!(f, "unclassified"),
            FileKind::Unwanted => write!(f, "unwanted"),
            FileKind::Thumbnail => write!(f, "thumbnail"),
            FileKind::OverlayImage => write!(f, "overlay-image"),
            FileKind::OverlayVideo => write!(f, "overlay-video"),
            FileKind::VoiceMemo => write!(f, "voice-memo"),
            FileKind::Media => write!(f, "media"),
        }
    }
}

/// Records split by kind after classification
#[derive(Debug, Default)]
pub struct Classified {
    /// `media` and `voice-memo` records, in path order
    pub media: Vec<FileRecord>,
    /// `overlay-image` and `overlay-video` records, in path order
    pub overlays: Vec<FileRecord>,
    /// Thumbnails, listed for external deletion
    pub thumbnails: Vec<FileRecord>,
    /// Number of unwanted files dropped
    pub unwanted: usize,
    /// Count per kind
    pub counts: BTreeMap<FileKind, usize>,
}

/// Rule-table classifier
pub struct Classifier<'a> {
    config: &'a CompiledConfig,
    rules: &'a [Rule],
}

impl<'a> Classifier<'a> {
    /// Classifier using the default rule order
    pub fn new(config: &'a CompiledConfig) -> Self {
        Self {
            config,
            rules: DEFAULT_RULES,
        }
    }

    /// Classifier with a custom rule order
    pub fn with_rules(config: &'a CompiledConfig, rules: &'a [Rule]) -> Self {
        Self { config, rules }
    }

    /// The first rule that claims `record`, if any
    pub fn matching_rule(&self, record: &FileRecord) -> Option<Rule> {
        self.rules
            .iter()
            .copied()
            .find(|rule| rule.matches(record, self.config))
    }

    /// Classify a single record
    pub fn classify(&self, record: &FileRecord) -> FileKind {
        self.matching_rule(record)
            .map(|rule| rule.kind())
            .unwrap_or(FileKind::Unwanted)
    }

    /// Classify a whole inventory, consuming it
    pub fn classify_all(&self, inventory: Inventory) -> Classified {
        let mut classified = Classified::default();

        for (_, record) in inventory.records {
            let kind = self.classify(&record);
            *classified.counts.entry(kind).or_insert(0) += 1;
            let record = record.with_kind(kind);

            if kind.is_dedup_candidate() {
                classified.media.push(record);
            } else if kind.is_overlay() {
                classified.overlays.push(record);
            } else if kind == FileKind::Thumbnail {
                classified.thumbnails.push(record);
            } else {
                debug!(path = %record.path.display(), "dropping unwanted file");
                classified.unwanted += 1;
            }
        }

        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ReconcileConfig;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn record(name: &str) -> FileRecord {
        FileRecord::new(PathBuf::from("/export").join(name), 100, SystemTime::UNIX_EPOCH)
    }

    fn classify(name: &str) -> FileKind {
        let config = ReconcileConfig::default().compile().unwrap();
        Classifier::new(&config).classify(&record(name))
    }

    #[test]
    fn plain_photo_is_media() {
        assert_eq!(classify("img_20230501_1200.jpg"), FileKind::Media);
        assert_eq!(classify("2023-05-01_clip.MP4"), FileKind::Media);
    }

    #[test]
    fn unknown_extension_is_unwanted() {
        assert_eq!(classify("notes.xyz"), FileKind::Unwanted);
        assert_eq!(classify("no_extension"), FileKind::Unwanted);
    }

    #[test]
    fn sidecar_is_unwanted_even_with_media_like_name() {
        assert_eq!(classify("memories_history.json"), FileKind::Unwanted);
        assert_eq!(classify("thumbnail_index.html"), FileKind::Unwanted);
    }

    #[test]
    fn thumbnail_beats_overlay() {
        assert_eq!(classify("abc-thumbnail.jpg"), FileKind::Thumbnail);
        assert_eq!(classify("abc-thumbnail_overlay.png"), FileKind::Thumbnail);
    }

    #[test]
    fn overlays_split_by_kind() {
        assert_eq!(classify("img_20230501_1200_overlay.png"), FileKind::OverlayImage);
        assert_eq!(classify("clip-overlay.mp4"), FileKind::OverlayVideo);
    }

    #[test]
    fn voice_memo_audio_needs_the_name() {
        assert_eq!(classify("2023-01-01_voice-memo.m4a"), FileKind::VoiceMemo);
        // Audio without the naming convention is not recognized
        assert_eq!(classify("song.mp3"), FileKind::Unwanted);
        // The naming convention on an image is still just an image
        assert_eq!(classify("voice-memo-cover.jpg"), FileKind::Media);
    }

    #[test]
    fn video_container_is_a_voice_memo_only_without_video_track() {
        let config = ReconcileConfig::default().compile().unwrap();
        let classifier = Classifier::new(&config);

        let clip = record("voice-note-party.mp4").with_video_track(Some(true));
        assert_eq!(classifier.classify(&clip), FileKind::Media);

        let unknown = record("chat-voicenote.mp4");
        assert_eq!(classifier.classify(&unknown), FileKind::Media);

        let token = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        let memo = record(&format!("2023-01-01_{token}-main.mp4")).with_video_track(Some(false));
        assert_eq!(classifier.classify(&memo), FileKind::VoiceMemo);
    }

    #[test]
    fn matching_rule_reports_first_match() {
        let config = ReconcileConfig::default().compile().unwrap();
        let classifier = Classifier::new(&config);
        assert_eq!(
            classifier.matching_rule(&record("x-thumbnail.jpg")),
            Some(Rule::ThumbnailName)
        );
        assert_eq!(classifier.matching_rule(&record("notes.xyz")), None);
    }

    #[test]
    fn custom_rule_order_changes_outcome() {
        let config = ReconcileConfig::default().compile().unwrap();
        let rules = [Rule::KnownMedia, Rule::ThumbnailName];
        let classifier = Classifier::with_rules(&config, &rules);
        assert_eq!(classifier.classify(&record("x-thumbnail.jpg")), FileKind::Media);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify("img_20230501_1200_overlay.png");
        let b = classify("img_20230501_1200_overlay.png");
        assert_eq!(a, b);
    }

    #[test]
    fn classify_all_partitions_records() {
        let config = ReconcileConfig::default().compile().unwrap();
        let mut inventory = Inventory::default();
        for name in [
            "a.jpg",
            "a_overlay.png",
            "a-thumbnail.jpg",
            "notes.xyz",
            "b-voice-memo.m4a",
        ] {
            let r = record(name);
            inventory.records.insert(r.path.clone(), r);
        }

        let classified = Classifier::new(&config).classify_all(inventory);

        assert_eq!(classified.media.len(), 2);
        assert_eq!(classified.overlays.len(), 1);
        assert_eq!(classified.thumbnails.len(), 1);
        assert_eq!(classified.unwanted, 1);
        assert_eq!(classified.counts[&FileKind::VoiceMemo], 1);
        assert!(classified.media.iter().all(|r| r.kind.is_dedup_candidate()));
        assert!(classified.overlays.iter().all(|r| r.kind.is_overlay()));
        assert!(classified.thumbnails.iter().all(|r| !r.kind.is_overlay()));
    }
}
