//! Events for real-time updates across operator clients.

use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Event types that can be broadcast to all connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BlinderEvent {
    /// The on-air selection changed
    SelectionChanged {
        previous: Selection,
        selection: Selection,
    },
    /// The controller was bound to a (new) running pipeline
    Attached { selection: Selection },
    /// A mix bus could not be resolved during a gain push
    BusMissing { bus: String },
    /// Current selection, sent when a client connects or has missed events
    Resync { selection: Selection },
}

impl BlinderEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            BlinderEvent::SelectionChanged {
                previous,
                selection,
            } => format!("Selection changed: {} -> {}", previous, selection),
            BlinderEvent::Attached { selection } => {
                format!("Attached to pipeline with selection {}", selection)
            }
            BlinderEvent::BusMissing { bus } => format!("Mix bus not found: {}", bus),
            BlinderEvent::Resync { selection } => format!("On air: {}", selection),
        }
    }
}
