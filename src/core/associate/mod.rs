//! # Associate Module
//!
//! Pairs each overlay with the base media it was exported from.
//!
//! ## Matching
//! - When both names carry the configured correlation token (an export
//!   UUID by default), the token decides.
//! - Otherwise the overlay stem (name minus overlay marker) is compared with
//!   every base stem (name minus base marker). The longest shared prefix
//!   ending on a separator wins; a closer length breaks ties.
//! - Remaining ties prefer a base carrying the base marker (`-main`), since
//!   exports only attach overlays to those. Then a base of the same kind
//!   (image overlay on an image, video overlay on a video). If still tied
//!   the overlay is left unpaired.
//!
//! Overlays are visited in path order and a base accepts one overlay. Later
//! claimants become standalone flagged items, so every overlay appears in
//! exactly one [`MediaItem`].

mod matcher;

pub use matcher::{base_stem, correlation_token, overlay_stem, BaseIndex, MatchScore};

use crate::core::classifier::FileKind;
use crate::core::config::CompiledConfig;
use crate::core::inventory::FileRecord;
use crate::core::media::{Category, MediaItem, ReviewFlag};
use crate::core::report::Anomaly;
use crate::events::{null_sender, AssociateEvent, Event, EventSender};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Output of the association stage
#[derive(Debug, Default)]
pub struct Association {
    /// One item per base, then one per unpaired overlay
    pub items: Vec<MediaItem>,
    /// Ambiguous, unmatched and conflicting overlays
    pub anomalies: Vec<Anomaly>,
    /// Overlays paired with a base
    pub associated: usize,
}

/// Overlay-to-base matcher
pub struct OverlayAssociator<'a> {
    config: &'a CompiledConfig,
}

impl<'a> OverlayAssociator<'a> {
    pub fn new(config: &'a CompiledConfig) -> Self {
        Self { config }
    }

    /// Associate without progress reporting
    pub fn associate(&self, bases: Vec<FileRecord>, overlays: Vec<FileRecord>) -> Association {
        self.associate_with_events(bases, overlays, &null_sender())
    }

    /// Associate overlays with the canonical bases
    pub fn associate_with_events(
        &self,
        mut bases: Vec<FileRecord>,
        mut overlays: Vec<FileRecord>,
        events: &EventSender,
    ) -> Association {
        bases.sort_by(|a, b| a.path.cmp(&b.path));
        overlays.sort_by(|a, b| a.path.cmp(&b.path));

        events.send(Event::Associate(AssociateEvent::Started {
            overlays: overlays.len(),
            bases: bases.len(),
        }));

        let index = BaseIndex::build(&bases, self.config);
        let mut claimed: HashMap<usize, FileRecord> = HashMap::new();
        let mut orphans: Vec<MediaItem> = Vec::new();
        let mut result = Association::default();

        for overlay in overlays {
            let stem = overlay_stem(&overlay, self.config);
            let token = correlation_token(&overlay.raw_filename, self.config);
            let candidates = index.best_candidates(&stem, token.as_deref());

            let chosen = match self.pick(&bases, &overlay, &candidates) {
                Some(idx) => idx,
                None => {
                    let anomaly = if candidates.is_empty() {
                        Anomaly::UnmatchedOverlay {
                            overlay: overlay.path.clone(),
                        }
                    } else {
                        Anomaly::AmbiguousOverlay {
                            overlay: overlay.path.clone(),
                            candidates: candidates
                                .iter()
                                .map(|&i| bases[i].path.clone())
                                .collect(),
                        }
                    };
                    let item = self.orphan(
                        overlay,
                        ReviewFlag::UnassociatedOverlay,
                        anomaly,
                        &mut result,
                        events,
                    );
                    orphans.push(item);
                    continue;
                }
            };

            if claimed.contains_key(&chosen) {
                let anomaly = Anomaly::OverlayConflict {
                    overlay: overlay.path.clone(),
                    base: bases[chosen].path.clone(),
                };
                let item =
                    self.orphan(overlay, ReviewFlag::OverlayConflict, anomaly, &mut result, events);
                orphans.push(item);
                continue;
            }

            debug!(
                overlay = %overlay.path.display(),
                base = %bases[chosen].path.display(),
                "overlay associated"
            );
            events.send(Event::Associate(AssociateEvent::Associated {
                overlay: overlay.path.clone(),
                base: bases[chosen].path.clone(),
            }));
            claimed.insert(chosen, overlay);
            result.associated += 1;
        }

        for (idx, base) in bases.into_iter().enumerate() {
            let category = self.category_of(&base);
            let mut item = MediaItem::new(base, category);
            item.overlay = claimed.remove(&idx);
            result.items.push(item);
        }
        result.items.extend(orphans);

        info!(
            associated = result.associated,
            unassociated = result.anomalies.len(),
            "association complete"
        );
        events.send(Event::Associate(AssociateEvent::Completed {
            associated: result.associated,
            unassociated: result.anomalies.len(),
        }));

        result
    }

    /// Resolve the best candidates to a single base
    fn pick(
        &self,
        bases: &[FileRecord],
        overlay: &FileRecord,
        candidates: &[usize],
    ) -> Option<usize> {
        if let [only] = candidates {
            return Some(*only);
        }

        let marked: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| self.config.base_marker.is_match(bases[i].stem()))
            .collect();
        if let [only] = marked.as_slice() {
            return Some(*only);
        }

        let pool = if marked.is_empty() { candidates } else { &marked[..] };
        let same_kind: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&i| self.same_kind(overlay, &bases[i]))
            .collect();
        match same_kind.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn same_kind(&self, overlay: &FileRecord, base: &FileRecord) -> bool {
        if base.kind != FileKind::Media {
            return false;
        }
        match overlay.kind {
            FileKind::OverlayImage => self.config.is_image_extension(&base.extension),
            FileKind::OverlayVideo => self.config.is_video_extension(&base.extension),
            _ => false,
        }
    }

    fn category_of(&self, base: &FileRecord) -> Category {
        if base.kind == FileKind::VoiceMemo {
            Category::VoiceMemo
        } else if self.config.is_video_extension(&base.extension) {
            Category::Video
        } else {
            Category::Photo
        }
    }

    fn orphan(
        &self,
        overlay: FileRecord,
        flag: ReviewFlag,
        anomaly: Anomaly,
        result: &mut Association,
        events: &EventSender,
    ) -> MediaItem {
        warn!("{}", anomaly);
        events.send(Event::Associate(AssociateEvent::Unassociated {
            overlay: overlay.path.clone(),
            reason: anomaly.to_string(),
        }));
        result.anomalies.push(anomaly);

        let mut item = MediaItem::new(overlay, Category::Overlay);
        item.flag(flag);
        item
    }
}
