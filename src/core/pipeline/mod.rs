//! # Pipeline Module
//!
//! Orchestrates the full reconciliation workflow.
//!
//! ## Pipeline Stages
//! 1. **Inventory** - Record every regular file under the export root
//! 2. **Classify** - Tag files by kind, drop unwanted ones
//! 3. **Dedup** - Collapse byte-identical media (parallel hashing)
//! 4. **Associate** - Pair overlays with their base media
//! 5. **Reconcile** - Resolve capture times
//!
//! Each stage consumes the previous stage's complete output. A fatal error
//! halts the run and names the stage; nothing from the run is returned.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, ReconciliationPlan};

use serde::{Deserialize, Serialize};

/// Stages of the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Inventory,
    Classify,
    Dedup,
    Associate,
    Reconcile,
    Done,
}

impl Stage {
    /// The stage that follows this one
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Inventory => Some(Stage::Classify),
            Stage::Classify => Some(Stage::Dedup),
            Stage::Dedup => Some(Stage::Associate),
            Stage::Associate => Some(Stage::Reconcile),
            Stage::Reconcile => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Inventory => write!(f, "Inventory"),
            Stage::Classify => write!(f, "Classify"),
            Stage::Dedup => write!(f, "Dedup"),
            Stage::Associate => write!(f, "Associate"),
            Stage::Reconcile => write!(f, "Reconcile"),
            Stage::Done => write!(f, "Done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_run_in_order() {
        let mut stage = Stage::Inventory;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(stage, Stage::Done);
    }
}
