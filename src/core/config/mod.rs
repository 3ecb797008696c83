//! # Config Module
//!
//! The option surface that drives classification, hashing, overlay
//! matching and date reconciliation.
//!
//! Filename conventions drift between export format versions, so every
//! naming rule lives here as a pattern rather than in code. A config is
//! plain data ([`ReconcileConfig`], serde-friendly) until it is compiled
//! into a [`CompiledConfig`], which is what the pipeline stages consume.
//!
//! ## Example
//! ```rust,ignore
//! let config = ReconcileConfig::from_json_file("config.json")?;
//! let compiled = config.compile()?;
//! ```

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Default streaming read size for content hashing (64 KiB)
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Videos above this size are fingerprinted from a prefix of this length (256 MiB)
pub const DEFAULT_HASH_SAMPLE_THRESHOLD: u64 = 256 * 1024 * 1024;

/// Overlay filename patterns, one per overlay kind.
///
/// The pattern that matches decides the overlay kind, so a `.png` caption
/// exported for a `-main.mp4` video is still an image overlay. Pairing does
/// not rely on that kind: a base carrying the base marker outranks a
/// same-kind base when stems tie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayPatterns {
    /// Matches image overlays (e.g. `..._overlay.png`)
    pub image: String,
    /// Matches video overlays (e.g. `..._overlay.mp4`)
    pub video: String,
}

impl Default for OverlayPatterns {
    fn default() -> Self {
        Self {
            image: r"(?i)[-_]overlay( ?\(\d+\))?\.(png|webp|jpe?g|gif)$".to_string(),
            video: r"(?i)[-_]overlay( ?\(\d+\))?\.(mp4|mov|webm)$".to_string(),
        }
    }
}

/// User-facing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Sidecar extensions dropped before anything else
    pub unwanted_extensions: BTreeSet<String>,
    /// Extensions accepted as still images
    pub image_extensions: BTreeSet<String>,
    /// Extensions accepted as videos
    pub video_extensions: BTreeSet<String>,
    /// Audio-only extensions (voice memo candidates)
    pub audio_extensions: BTreeSet<String>,
    /// Filenames matching this are thumbnails
    pub thumbnail_pattern: String,
    pub overlay_patterns: OverlayPatterns,
    /// Audio files matching this are voice memos (video containers are
    /// decided by their tracks instead)
    pub voice_memo_pattern: String,
    /// Marker stripped from a base media stem before correlation (e.g. `-main`)
    pub base_marker_pattern: String,
    /// Optional token that identifies a capture in both base and overlay names
    pub correlation_token_pattern: Option<String>,
    /// Streaming read size in bytes
    pub hash_chunk_size: usize,
    /// Size above which videos are fingerprinted from a prefix plus size
    pub hash_sample_threshold: u64,
    /// Hashing worker threads (0 = one per CPU)
    pub concurrency_limit: usize,
    /// Use the file modification time when no other date source exists
    pub allow_mtime_fallback: bool,
    /// Use the embedded EXIF capture date before falling back to mtime
    pub allow_exif_fallback: bool,
}

fn extension_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            unwanted_extensions: extension_set(&[
                "json", "html", "htm", "txt", "csv", "xml", "js", "css", "db", "zip", "pdf",
            ]),
            image_extensions: extension_set(&["jpg", "jpeg", "png", "webp", "heic", "heif", "gif"]),
            video_extensions: extension_set(&["mp4", "mov", "webm", "m4v"]),
            audio_extensions: extension_set(&["m4a", "aac", "mp3", "wav", "ogg", "opus"]),
            thumbnail_pattern: r"(?i)thumbnail".to_string(),
            overlay_patterns: OverlayPatterns::default(),
            voice_memo_pattern: r"(?i)voice[-_ ]?(memo|note)".to_string(),
            base_marker_pattern: r"(?i)[-_]main$".to_string(),
            correlation_token_pattern: Some(
                r"[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}"
                    .to_string(),
            ),
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
            hash_sample_threshold: DEFAULT_HASH_SAMPLE_THRESHOLD,
            concurrency_limit: 0,
            allow_mtime_fallback: false,
            allow_exif_fallback: true,
        }
    }
}

impl ReconcileConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Validate and compile all patterns
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hash_chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.hash_sample_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hash_sample_threshold",
                reason: "must be greater than zero".to_string(),
            });
        }

        let correlation_token = match &self.correlation_token_pattern {
            Some(pattern) if !pattern.is_empty() => {
                Some(compile_pattern("correlation_token_pattern", pattern)?)
            }
            _ => None,
        };

        Ok(CompiledConfig {
            unwanted_extensions: lowercase_set(&self.unwanted_extensions),
            image_extensions: lowercase_set(&self.image_extensions),
            video_extensions: lowercase_set(&self.video_extensions),
            audio_extensions: lowercase_set(&self.audio_extensions),
            thumbnail: compile_pattern("thumbnail_pattern", &self.thumbnail_pattern)?,
            overlay_image: compile_pattern("overlay_patterns.image", &self.overlay_patterns.image)?,
            overlay_video: compile_pattern("overlay_patterns.video", &self.overlay_patterns.video)?,
            voice_memo: compile_pattern("voice_memo_pattern", &self.voice_memo_pattern)?,
            base_marker: compile_pattern("base_marker_pattern", &self.base_marker_pattern)?,
            correlation_token,
            hash_chunk_size: self.hash_chunk_size,
            hash_sample_threshold: self.hash_sample_threshold,
            concurrency_limit: self.concurrency_limit,
            allow_mtime_fallback: self.allow_mtime_fallback,
            allow_exif_fallback: self.allow_exif_fallback,
        })
    }
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn lowercase_set(set: &BTreeSet<String>) -> BTreeSet<String> {
    set.iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect()
}

/// Validated configuration with compiled patterns
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub unwanted_extensions: BTreeSet<String>,
    pub image_extensions: BTreeSet<String>,
    pub video_extensions: BTreeSet<String>,
    pub audio_extensions: BTreeSet<String>,
    pub thumbnail: Regex,
    pub overlay_image: Regex,
    pub overlay_video: Regex,
    pub voice_memo: Regex,
    pub base_marker: Regex,
    pub correlation_token: Option<Regex>,
    pub hash_chunk_size: usize,
    pub hash_sample_threshold: u64,
    pub concurrency_limit: usize,
    pub allow_mtime_fallback: bool,
    pub allow_exif_fallback: bool,
}

impl CompiledConfig {
    pub fn is_image_extension(&self, ext: &str) -> bool {
        self.image_extensions.contains(ext)
    }

    pub fn is_video_extension(&self, ext: &str) -> bool {
        self.video_extensions.contains(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_compiles() {
        let compiled = ReconcileConfig::default().compile().unwrap();
        assert!(compiled.is_image_extension("jpg"));
        assert!(compiled.is_video_extension("mp4"));
        assert!(compiled.correlation_token.is_some());
        assert!(!compiled.allow_mtime_fallback);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let config = ReconcileConfig {
            thumbnail_pattern: "([".to_string(),
            ..Default::default()
        };
        match config.compile() {
            Err(ConfigError::InvalidPattern { field, .. }) => {
                assert_eq!(field, "thumbnail_pattern")
            }
            other => panic!("expected invalid pattern, got {:?}", other),
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = ReconcileConfig {
            hash_chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidValue { field: "hash_chunk_size", .. })
        ));
    }

    #[test]
    fn extensions_are_normalized() {
        let config = ReconcileConfig {
            image_extensions: extension_set(&[".JPG", "Png"]),
            ..Default::default()
        };
        let compiled = config.compile().unwrap();
        assert!(compiled.is_image_extension("jpg"));
        assert!(compiled.is_image_extension("png"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "allow_mtime_fallback": true, "concurrency_limit": 2 }}"#).unwrap();

        let config = ReconcileConfig::from_json_file(file.path()).unwrap();

        assert!(config.allow_mtime_fallback);
        assert_eq!(config.concurrency_limit, 2);
        assert_eq!(config.hash_chunk_size, DEFAULT_HASH_CHUNK_SIZE);
        assert_eq!(config.thumbnail_pattern, ReconcileConfig::default().thumbnail_pattern);
    }

    #[test]
    fn empty_correlation_token_disables_it() {
        let config = ReconcileConfig {
            correlation_token_pattern: Some(String::new()),
            ..Default::default()
        };
        assert!(config.compile().unwrap().correlation_token.is_none());
    }
}
