//! Error types for topology generation, switching and graph hosting.

use gstreamer as gst;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlinderError {
    #[error("Duplicate filler source name: {0}")]
    DuplicateFillerName(String),

    #[error("Invalid filler source name: {0:?}")]
    InvalidFillerName(String),

    #[error("Mix bus not found: {0}")]
    BusNotFound(String),

    #[error("Pad {pad} not found on mix bus {bus}")]
    PadNotFound { bus: String, pad: String },

    #[error("Invalid selection {index}: {count} filler source(s) configured")]
    InvalidSelection { index: usize, count: usize },

    #[error("Unknown filler source: {0}")]
    UnknownFiller(String),

    #[error("Upstream producer not found: {0}")]
    UpstreamNotFound(String),

    #[error("Failed to create element: {0}")]
    ElementCreation(String),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("State change failed: {0}")]
    StateChange(String),

    #[error("Failed to link {0}: {1}")]
    LinkError(String, String),

    #[error("GStreamer error: {0}")]
    GStreamer(#[from] gst::glib::Error),

    #[error("GStreamer boolean error: {0}")]
    BoolError(#[from] gst::glib::BoolError),
}

impl BlinderError {
    /// Whether this error only affects a single bus during a gain push.
    pub fn is_bus_local(&self) -> bool {
        matches!(
            self,
            BlinderError::BusNotFound(_) | BlinderError::PadNotFound { .. }
        )
    }
}
