//! Pipeline execution implementation.

use super::Stage;
use crate::core::associate::OverlayAssociator;
use crate::core::classifier::Classifier;
use crate::core::config::{CompiledConfig, ReconcileConfig};
use crate::core::dedup::Deduplicator;
use crate::core::inventory::InventoryBuilder;
use crate::core::media::{Discard, MediaItem};
use crate::core::reconcile::MetadataReconciler;
use crate::core::report::{PlanSummary, RunReport};
use crate::error::{ConfigError, ReconcileError};
use crate::events::{null_sender, Event, EventSender, PipelineEvent};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// The declarative result of a run: what to keep, where it belongs in time,
/// and what may be deleted. Nothing on disk has been changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Unique id of this run
    pub id: Uuid,
    /// Export root that was reconciled
    pub root: PathBuf,
    /// Items ordered by capture time, undated last
    pub items: Vec<MediaItem>,
    /// Duplicates and thumbnails, in path order
    pub discards: Vec<Discard>,
    pub report: RunReport,
    pub summary: PlanSummary,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ReconciliationPlan {
    /// Items without a capture time
    pub fn undated(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(|i| i.capture_time.is_none())
    }

    /// Items carrying at least one review flag
    pub fn flagged(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(|i| i.needs_review())
    }
}

/// Builder for pipeline configuration
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    root: Option<PathBuf>,
    config: ReconcileConfig,
    max_depth: Option<usize>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the export root to reconcile
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Limit how deep the inventory walks
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Validate the configuration and build the pipeline
    pub fn build(self) -> Result<Pipeline, ReconcileError> {
        let root = self.root.ok_or_else(|| ConfigError::InvalidValue {
            field: "root",
            reason: "no export root given".to_string(),
        })?;
        let config = self.config.compile()?;

        let mut inventory = InventoryBuilder::new();
        if let Some(depth) = self.max_depth {
            inventory = inventory.max_depth(depth);
        }

        Ok(Pipeline {
            root,
            config,
            inventory,
        })
    }
}

/// The reconciliation pipeline
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    config: CompiledConfig,
    inventory: InventoryBuilder,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &CompiledConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<ReconciliationPlan, ReconcileError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &self,
        events: &EventSender,
    ) -> Result<ReconciliationPlan, ReconcileError> {
        let start_time = Instant::now();
        let mut report = RunReport::new();
        let mut summary = PlanSummary::default();

        events.send(Event::Pipeline(PipelineEvent::Started));
        info!(root = %self.root.display(), "reconciliation started");

        // Stage 1: Inventory
        enter(Stage::Inventory, events);
        let inventory = self
            .inventory
            .build_with_events(&self.root, events)
            .map_err(|e| fail(Stage::Inventory, e, events))?;
        summary.files_inventoried = inventory.records.len();
        report.extend(inventory.warnings.iter().cloned());

        // Stage 2: Classify
        enter(Stage::Classify, events);
        let classified = Classifier::new(&self.config).classify_all(inventory);
        summary.kind_counts = classified.counts.clone();
        summary.overlays = classified.overlays.len();
        summary.thumbnails_discarded = classified.thumbnails.len();
        let mut discards: Vec<Discard> =
            classified.thumbnails.iter().map(Discard::thumbnail).collect();

        // Stage 3: Dedup
        enter(Stage::Dedup, events);
        let deduped = Deduplicator::new(&self.config)
            .deduplicate_with_events(classified.media, events)
            .map_err(|e| fail(Stage::Dedup, e, events))?;
        summary.duplicates_discarded = deduped.discards.len();
        discards.extend(deduped.discards);
        discards.sort_by(|a, b| a.path.cmp(&b.path));
        report.extend(deduped.warnings);

        // Stage 4: Associate
        enter(Stage::Associate, events);
        let association = OverlayAssociator::new(&self.config).associate_with_events(
            deduped.canonical,
            classified.overlays,
            events,
        );
        summary.overlays_associated = association.associated;
        for anomaly in association.anomalies {
            report.anomaly(anomaly);
        }

        // Stage 5: Reconcile
        enter(Stage::Reconcile, events);
        let reconciled =
            MetadataReconciler::new(&self.config).reconcile_with_events(association.items, events);
        for anomaly in reconciled.anomalies {
            report.anomaly(anomaly);
        }

        let mut items = reconciled.items;
        items.sort_by(|a, b| {
            let key = |i: &MediaItem| (i.capture_time.is_none(), i.capture_time.map(|t| t.local));
            key(a)
                .cmp(&key(b))
                .then_with(|| a.base.path.cmp(&b.base.path))
        });

        enter(Stage::Done, events);
        summary.items = items.len();
        summary.undated = items.iter().filter(|i| i.capture_time.is_none()).count();
        summary.flagged = items.iter().filter(|i| i.needs_review()).count();
        summary.warnings = report.len();
        summary.bytes_reclaimable = discards.iter().map(|d| d.size_bytes).sum();

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            items = summary.items,
            discards = discards.len(),
            warnings = summary.warnings,
            duration_ms,
            "reconciliation complete"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(ReconciliationPlan {
            id: Uuid::new_v4(),
            root: self.root.clone(),
            items,
            discards,
            report,
            summary,
            duration_ms,
        })
    }
}

fn enter(stage: Stage, events: &EventSender) {
    events.send(Event::Pipeline(PipelineEvent::StageChanged { stage }));
}

/// Wrap a fatal error with its stage and announce the halt
fn fail(stage: Stage, source: impl Into<ReconcileError>, events: &EventSender) -> ReconcileError {
    let source = source.into();
    error!(%stage, "pipeline halted: {}", source);
    events.send(Event::Pipeline(PipelineEvent::Failed {
        stage,
        message: source.to_string(),
    }));
    ReconcileError::in_stage(stage, source)
}
