//! Stem and token matching between overlays and base media.

use crate::core::classifier::FileKind;
use crate::core::config::CompiledConfig;
use crate::core::inventory::FileRecord;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// How well a base matches an overlay. Higher is better.
///
/// Ordered by matched stem length, then by fewest unmatched characters.
pub type MatchScore = (usize, Reverse<usize>);

/// Score of a correlation token match; beats any stem match
const TOKEN_SCORE: MatchScore = (usize::MAX, Reverse(0));

/// Characters that may follow a shared stem
fn is_boundary(c: char) -> bool {
    matches!(c, '-' | '_' | '.' | ' ' | '(')
}

/// Correlation stem of a base record: file stem minus the base marker
pub fn base_stem(record: &FileRecord, config: &CompiledConfig) -> String {
    config
        .base_marker
        .replace(record.stem(), "")
        .to_lowercase()
}

/// Correlation stem of an overlay record: filename minus the overlay marker
pub fn overlay_stem(record: &FileRecord, config: &CompiledConfig) -> String {
    let pattern = match record.kind {
        FileKind::OverlayVideo => &config.overlay_video,
        _ => &config.overlay_image,
    };
    let stripped = pattern.replace(&record.raw_filename, "");

    // Custom patterns may leave the extension in place
    let suffix = format!(".{}", record.extension);
    let cut = stripped.len().saturating_sub(suffix.len());
    let has_extension = !record.extension.is_empty()
        && stripped.len() > suffix.len()
        && stripped.is_char_boundary(cut)
        && stripped[cut..].eq_ignore_ascii_case(&suffix);
    let stem = if has_extension { &stripped[..cut] } else { &stripped[..] };
    stem.to_lowercase()
}

/// First correlation token in a filename, if the config defines one
pub fn correlation_token(filename: &str, config: &CompiledConfig) -> Option<String> {
    config
        .correlation_token
        .as_ref()
        .and_then(|re| re.find(filename))
        .map(|m| m.as_str().to_lowercase())
}

/// Lookup tables over the canonical base records
pub struct BaseIndex {
    stems: BTreeMap<String, Vec<usize>>,
    tokens: HashMap<String, Vec<usize>>,
}

impl BaseIndex {
    pub fn build(bases: &[FileRecord], config: &CompiledConfig) -> Self {
        let mut stems: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut tokens: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, base) in bases.iter().enumerate() {
            let stem = base_stem(base, config);
            if !stem.is_empty() {
                stems.entry(stem).or_default().push(idx);
            }
            if let Some(token) = correlation_token(&base.raw_filename, config) {
                tokens.entry(token).or_default().push(idx);
            }
        }

        Self { stems, tokens }
    }

    /// Every base sharing the best score with the overlay
    pub fn best_candidates(&self, stem: &str, token: Option<&str>) -> Vec<usize> {
        let scored = self.candidates(stem, token);
        let Some(best) = scored.iter().map(|(_, score)| *score).max() else {
            return Vec::new();
        };

        let mut best_bases: Vec<usize> = scored
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(idx, _)| idx)
            .collect();
        best_bases.sort_unstable();
        best_bases.dedup();
        best_bases
    }

    /// Every base that matches the overlay, with its score
    pub fn candidates(&self, stem: &str, token: Option<&str>) -> Vec<(usize, MatchScore)> {
        if let Some(indices) = token.and_then(|t| self.tokens.get(t)) {
            return indices.iter().map(|&idx| (idx, TOKEN_SCORE)).collect();
        }
        if stem.is_empty() {
            return Vec::new();
        }

        // Only the overlay stem or a boundary prefix of it can name a base
        let mut found = Vec::new();
        let prefix_ends = stem
            .char_indices()
            .filter(|(_, c)| is_boundary(*c))
            .map(|(i, _)| i)
            .chain(std::iter::once(stem.len()));
        for end in prefix_ends {
            if let Some(indices) = self.stems.get(&stem[..end]) {
                let score = (end, Reverse(stem.len() - end));
                found.extend(indices.iter().map(|&idx| (idx, score)));
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ReconcileConfig;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn record(name: &str, kind: FileKind) -> FileRecord {
        FileRecord::new(PathBuf::from("/export").join(name), 1, SystemTime::UNIX_EPOCH)
            .with_kind(kind)
    }

    fn config() -> CompiledConfig {
        ReconcileConfig::default().compile().unwrap()
    }

    #[test]
    fn overlay_stem_strips_marker_and_extension() {
        let config = config();
        let overlay = record("img_20230501_1200_overlay.png", FileKind::OverlayImage);
        assert_eq!(overlay_stem(&overlay, &config), "img_20230501_1200");

        let copy = record("clip-overlay(2).mp4", FileKind::OverlayVideo);
        assert_eq!(overlay_stem(&copy, &config), "clip");
    }

    #[test]
    fn base_stem_strips_main_marker() {
        let config = config();
        let base = record("2021-07-04_abc-main.jpg", FileKind::Media);
        assert_eq!(base_stem(&base, &config), "2021-07-04_abc");
    }

    #[test]
    fn exact_stem_beats_longer_base() {
        let config = config();
        let bases = vec![
            record("img_1200.jpg", FileKind::Media),
            record("img_1200(1).jpg", FileKind::Media),
        ];
        let index = BaseIndex::build(&bases, &config);

        assert_eq!(index.best_candidates("img_1200", None), vec![0]);
    }

    #[test]
    fn longest_prefix_wins() {
        let config = config();
        let bases = vec![
            record("trip.jpg", FileKind::Media),
            record("trip_day2.jpg", FileKind::Media),
        ];
        let index = BaseIndex::build(&bases, &config);

        assert_eq!(index.best_candidates("trip_day2_edit", None), vec![1]);
    }

    #[test]
    fn prefix_must_end_on_a_boundary() {
        let config = config();
        let bases = vec![record("img1.jpg", FileKind::Media)];
        let index = BaseIndex::build(&bases, &config);

        assert!(index.best_candidates("img12", None).is_empty());
        assert!(index.best_candidates("img", None).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let config = config();
        let bases = vec![record("Snap_ABC.JPG", FileKind::Media)];
        let index = BaseIndex::build(&bases, &config);
        let overlay = record("snap_abc_OVERLAY.png", FileKind::OverlayImage);

        assert_eq!(
            index.best_candidates(&overlay_stem(&overlay, &config), None),
            vec![0]
        );
    }

    #[test]
    fn token_match_overrides_stems() {
        let config = config();
        let uuid = "3F2504E0-4F89-11D3-9A0C-0305E82C3301";
        let bases = vec![
            record(&format!("2021-07-04_{uuid}-main.jpg"), FileKind::Media),
            record("2021-07-04.jpg", FileKind::Media),
        ];
        let index = BaseIndex::build(&bases, &config);
        let overlay_name = format!("2021-07-04_{}-overlay.png", uuid.to_lowercase());
        let token = correlation_token(&overlay_name, &config);

        assert_eq!(index.best_candidates("unrelated", token.as_deref()), vec![0]);
    }

    #[test]
    fn longer_base_stem_is_not_a_candidate() {
        let config = config();
        let bases = vec![record("2023-01-01_beach-sunset-video.mp4", FileKind::Media)];
        let index = BaseIndex::build(&bases, &config);
        let overlay = record("2023-01-01_overlay.png", FileKind::OverlayImage);

        assert_eq!(overlay_stem(&overlay, &config), "2023-01-01");
        assert!(index.best_candidates("2023-01-01", None).is_empty());
    }

    #[test]
    fn equal_scores_are_all_returned() {
        let config = config();
        let bases = vec![
            record("a.jpg", FileKind::Media),
            record("a.mp4", FileKind::Media),
        ];
        let index = BaseIndex::build(&bases, &config);

        assert_eq!(index.best_candidates("a", None), vec![0, 1]);
    }
}
