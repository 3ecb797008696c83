//! # Events Module
//!
//! Progress reporting for any UI layer.
//!
//! ## Design
//! The core library emits events through channels, allowing a CLI or GUI
//! to subscribe and display progress without the library knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! // In a separate thread, listen for events
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Inventory(InventoryEvent::Progress(p)) => println!("Found {} files", p.files_found),
//!             Event::Hash(HashEvent::Progress(p)) => println!("Hashed {}/{}", p.completed, p.total),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! // Run the pipeline with the sender
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
