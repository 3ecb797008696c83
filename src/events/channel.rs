//! Event channel built on crossbeam-channel.
//!
//! Stages publish through an [`EventSender`]; a UI drains the matching
//! [`EventReceiver`] on its own thread. The channel is unbounded so a slow
//! progress bar never stalls hashing or apply.

use super::Event;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Publishing half handed to every stage.
///
/// Cheap to clone and `Send`, so rayon workers can hold one each. A sender
/// from [`null_sender`] has no channel behind it and drops every event.
#[derive(Clone, Debug, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    /// Publish an event. A receiver that has gone away is not an error.
    pub fn send(&self, event: Event) {
        if let Some(inner) = &self.inner {
            let _ = inner.send(event);
        }
    }

    /// Whether anyone could be listening
    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }
}

/// Subscribing half used by a CLI or GUI
#[derive(Debug)]
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Everything queued right now, without blocking
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

/// Factory for connected sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender {
                inner: Some(sender),
            },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender for runs nobody watches (tests, library callers without a UI)
pub fn null_sender() -> EventSender {
    EventSender::default()
}
