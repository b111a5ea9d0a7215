//! GStreamer integration.
//!
//! Instantiates a [`blinder_types::GraphTopology`] inside a pipeline and
//! exposes the resulting mixers to the switch controller.

pub mod graph;
pub mod host;
pub mod pipeline;
pub mod sources;

pub use graph::instantiate;
pub use host::GstGraphHost;
pub use pipeline::BlinderPipeline;
