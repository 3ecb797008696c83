//! The classification rule table.

use super::FileKind;
use crate::core::config::CompiledConfig;
use crate::core::inventory::FileRecord;
use serde::{Deserialize, Serialize};

/// A single classification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Extension is in the unwanted set
    UnwantedExtension,
    /// Filename matches the thumbnail pattern
    ThumbnailName,
    /// Filename matches the image overlay pattern
    OverlayImageName,
    /// Filename matches the video overlay pattern
    OverlayVideoName,
    /// Audio file with a voice memo name, or a video container without a
    /// video track
    VoiceMemo,
    /// Known image or video extension
    KnownMedia,
}

/// Rules in evaluation order
pub const DEFAULT_RULES: &[Rule] = &[
    Rule::UnwantedExtension,
    Rule::ThumbnailName,
    Rule::OverlayImageName,
    Rule::OverlayVideoName,
    Rule::VoiceMemo,
    Rule::KnownMedia,
];

impl Rule {
    /// The kind assigned when this rule matches
    pub fn kind(&self) -> FileKind {
        match self {
            Rule::UnwantedExtension => FileKind::Unwanted,
            Rule::ThumbnailName => FileKind::Thumbnail,
            Rule::OverlayImageName => FileKind::OverlayImage,
            Rule::OverlayVideoName => FileKind::OverlayVideo,
            Rule::VoiceMemo => FileKind::VoiceMemo,
            Rule::KnownMedia => FileKind::Media,
        }
    }

    /// Whether this rule claims `record`
    pub fn matches(&self, record: &FileRecord, config: &CompiledConfig) -> bool {
        let ext = record.extension.as_str();
        let name = record.raw_filename.as_str();

        match self {
            Rule::UnwantedExtension => config.unwanted_extensions.contains(ext),
            Rule::ThumbnailName => config.thumbnail.is_match(name),
            Rule::OverlayImageName => config.overlay_image.is_match(name),
            Rule::OverlayVideoName => config.overlay_video.is_match(name),
            Rule::VoiceMemo => {
                if config.is_video_extension(ext) {
                    // Unknown layout stays video; the name never decides
                    record.has_video_track == Some(false)
                } else {
                    config.audio_extensions.contains(ext) && config.voice_memo.is_match(name)
                }
            }
            Rule::KnownMedia => config.is_image_extension(ext) || config.is_video_extension(ext),
        }
    }

    /// Human-readable description of the rule
    pub fn description(&self) -> &'static str {
        match self {
            Rule::UnwantedExtension => "Sidecar or non-media extension",
            Rule::ThumbnailName => "Thumbnail naming pattern",
            Rule::OverlayImageName => "Image overlay naming pattern",
            Rule::OverlayVideoName => "Video overlay naming pattern",
            Rule::VoiceMemo => "Voice memo audio or a container with no video track",
            Rule::KnownMedia => "Known photo or video type",
        }
    }
}
