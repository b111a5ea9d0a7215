//! Blinder event fan-out to operator clients.
//!
//! Besides relaying [`BlinderEvent`]s, the broadcaster remembers which
//! selection is on air. Every subscription starts with a
//! [`BlinderEvent::Resync`], and a subscriber that falls behind the channel
//! gets another one in place of the events it missed, so a client's view of
//! the on-air state never goes stale.

use axum::response::sse::{Event, KeepAlive};
use axum::response::Sse;
use blinder_types::{BlinderEvent, Selection};
use futures::Stream;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, warn};

/// Event broadcaster for SSE (Server-Sent Events).
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<BlinderEvent>>,
    /// Last selection seen in a broadcast
    on_air: Arc<Mutex<Option<Selection>>>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster with a buffer size.
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
            on_air: Arc::new(Mutex::new(None)),
        }
    }

    /// Record the on-air selection without notifying anyone.
    pub fn set_on_air(&self, selection: Selection) {
        *self.on_air.lock() = Some(selection);
    }

    /// Selection on air as far as broadcasts have told.
    pub fn on_air(&self) -> Option<Selection> {
        *self.on_air.lock()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: BlinderEvent) {
        debug!("Broadcasting event: {}", event.description());
        match &event {
            BlinderEvent::SelectionChanged { selection, .. }
            | BlinderEvent::Attached { selection }
            | BlinderEvent::Resync { selection } => self.set_on_air(*selection),
            BlinderEvent::BusMissing { .. } => {}
        }
        // No receivers is fine: operators may not be watching
        let _ = self.sender.send(event);
    }

    /// Subscribe to blinder events.
    ///
    /// The stream opens with a resync (once a selection is known) and
    /// replaces any run of missed events with a fresh resync.
    pub fn events(&self) -> impl Stream<Item = BlinderEvent> {
        let rx = self.sender.subscribe();
        let initial = self.on_air().map(|selection| BlinderEvent::Resync { selection });
        let on_air = self.on_air.clone();

        let updates = BroadcastStream::new(rx).filter_map(move |result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                let selection = (*on_air.lock())?;
                warn!(
                    "Client lagged by {} events, resyncing to {}",
                    skipped, selection
                );
                Some(BlinderEvent::Resync { selection })
            }
        });

        tokio_stream::iter(initial).chain(updates)
    }

    /// Subscribe to events and get a SSE stream.
    pub fn subscribe(&self) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let event_stream = self.events().filter_map(|event| {
            debug!("Sending SSE event: {}", event.description());
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    None
                }
            }
        });

        Sse::new(event_stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
    }

    /// Subscribe to the raw event channel.
    pub fn receiver(&self) -> broadcast::Receiver<BlinderEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
