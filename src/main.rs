//! # reconcile-export
//!
//! Command-line entry point for the export reconciler.
//!
//! ## Usage
//! ```bash
//! reconcile-export plan ~/Downloads/mydata --output csv > review.csv
//! reconcile-export apply ~/Downloads/mydata --dest ~/Pictures/Memories --dry-run
//! ```

mod cli;

use media_export_reconciler::Result;

fn main() -> Result<()> {
    // RUST_LOG controls verbosity; a subscriber that is already set is fine
    media_export_reconciler::init_tracing().ok();
    cli::run()
}
