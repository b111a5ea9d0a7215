//! Shared types for the Blinder filler-source switcher.
//!
//! This crate contains the topology description, the selection model and
//! the API types shared between the engine and operator clients.

/// Default port for the Blinder operator API.
pub const DEFAULT_PORT: u16 = 8090;

pub mod api;
pub mod events;
pub mod selection;
pub mod topology;

// Re-export commonly used types
pub use events::BlinderEvent;
pub use selection::{gain_vector, Selection, SelectionChoice};
pub use topology::{
    BusKind, BusPad, BusRole, FillerSource, GraphTopology, MixBusSpec, NodeKind, PadFeed, PadRef,
    TopologyLink, TopologyNode,
};
