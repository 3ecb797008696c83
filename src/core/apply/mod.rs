//! Applies a reconciliation plan to the filesystem.
//!
//! The pipeline itself only reads. This module is the separate, replayable
//! step that copies or moves kept files into a dated folder tree, stamps
//! capture times, deletes discards and prunes empty folders. Planning and
//! execution are split so a dry run can show every action first.

mod executor;
mod planner;
mod types;

pub use executor::ApplyExecutor;
pub use planner::ApplyPlanner;
pub use types::*;
