//! Application state management.

use blinder_types::GraphTopology;
use std::sync::Arc;

use crate::events::EventBroadcaster;
use crate::switch::SwitchController;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The blinder switch, shared with whatever attaches it to a graph
    controller: Arc<SwitchController>,
    /// Event broadcaster for real-time updates
    events: EventBroadcaster,
}

impl AppState {
    /// Create state for a topology, with a controller that reports its
    /// changes on the state's event broadcaster.
    pub fn new(topology: GraphTopology) -> Self {
        let events = EventBroadcaster::default();
        let controller =
            SwitchController::new(Arc::new(topology)).with_events(events.clone());
        Self {
            inner: Arc::new(AppStateInner {
                controller: Arc::new(controller),
                events,
            }),
        }
    }

    /// Get the switch controller.
    pub fn controller(&self) -> &Arc<SwitchController> {
        &self.inner.controller
    }

    /// Get the event broadcaster.
    pub fn events(&self) -> &EventBroadcaster {
        &self.inner.events
    }
}
