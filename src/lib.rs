//! # Media Export Reconciler
//!
//! Turns a messy social media export into a clean, dated media library.
//!
//! ## Core Philosophy
//! - **Plan first** - The pipeline only reads; every change is an explicit action
//! - **Lose nothing** - Anything uncertain is flagged for review, never dropped
//! - **Same input, same plan** - Canonical choices and ordering are deterministic
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Inventory, classification, dedup, overlay association, dating
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ReconcileError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Returns an error
/// if a global subscriber is already installed.
pub fn init_tracing() -> std::result::Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
