//! # Reconcile Module
//!
//! Resolves the effective capture time of every [`MediaItem`].
//!
//! ## Precedence
//! 1. Base filename
//! 2. Overlay filename
//! 3. Embedded EXIF `DateTimeOriginal` of the base (`allow_exif_fallback`)
//! 4. File modification time (`allow_mtime_fallback`, flagged low confidence)
//!
//! An item with no source is left undated and flagged for manual review.

mod exif;

pub use exif::read_capture_time;

use crate::core::config::CompiledConfig;
use crate::core::media::{Category, MediaItem, ReviewFlag, TimeSource};
use crate::core::report::Anomaly;
use crate::core::timestamp::{self, Timestamp};
use crate::events::{null_sender, Event, EventSender, ReconcileEvent};
use tracing::{debug, info};

/// Output of the reconcile stage
#[derive(Debug, Default)]
pub struct Reconciled {
    pub items: Vec<MediaItem>,
    /// One `UnparseableTimestamp` per undated item
    pub anomalies: Vec<Anomaly>,
}

/// Capture time resolver
pub struct MetadataReconciler<'a> {
    config: &'a CompiledConfig,
}

impl<'a> MetadataReconciler<'a> {
    pub fn new(config: &'a CompiledConfig) -> Self {
        Self { config }
    }

    /// Reconcile without progress reporting
    pub fn reconcile(&self, items: Vec<MediaItem>) -> Reconciled {
        self.reconcile_with_events(items, &null_sender())
    }

    /// Set the capture time of every item
    pub fn reconcile_with_events(
        &self,
        mut items: Vec<MediaItem>,
        events: &EventSender,
    ) -> Reconciled {
        events.send(Event::Reconcile(ReconcileEvent::Started {
            total_items: items.len(),
        }));

        let mut anomalies = Vec::new();

        for item in &mut items {
            match self.resolve(item) {
                Some((timestamp, source)) => {
                    item.capture_time = Some(timestamp);
                    item.time_source = Some(source);
                    if source == TimeSource::ModifiedTime {
                        item.flag(ReviewFlag::LowConfidenceDate);
                    }
                }
                None => {
                    debug!(path = %item.base.path.display(), "no capture time");
                    item.flag(ReviewFlag::NeedsManualDate);
                    events.send(Event::Reconcile(ReconcileEvent::Undated {
                        path: item.base.path.clone(),
                    }));
                    anomalies.push(Anomaly::UnparseableTimestamp {
                        path: item.base.path.clone(),
                    });
                }
            }
        }

        let undated = anomalies.len();
        info!(dated = items.len() - undated, undated, "reconcile complete");
        events.send(Event::Reconcile(ReconcileEvent::Completed {
            dated: items.len() - undated,
            undated,
        }));

        Reconciled { items, anomalies }
    }

    /// The first available capture time for an item and where it came from
    pub fn resolve(&self, item: &MediaItem) -> Option<(Timestamp, TimeSource)> {
        // An overlay-only item's base is the overlay itself
        let base_source = if item.category == Category::Overlay {
            TimeSource::OverlayFilename
        } else {
            TimeSource::BaseFilename
        };
        if let Some(ts) = timestamp::parse_filename(&item.base.raw_filename) {
            return Some((ts, base_source));
        }

        if let Some(ts) = item
            .overlay
            .as_ref()
            .and_then(|o| timestamp::parse_filename(&o.raw_filename))
        {
            return Some((ts, TimeSource::OverlayFilename));
        }

        if self.config.allow_exif_fallback && self.config.is_image_extension(&item.base.extension)
        {
            if let Some(ts) = read_capture_time(&item.base.path) {
                return Some((ts, TimeSource::EmbeddedExif));
            }
        }

        if self.config.allow_mtime_fallback {
            return Some((
                Timestamp::from_system_time(item.base.modified),
                TimeSource::ModifiedTime,
            ));
        }

        None
    }
}
