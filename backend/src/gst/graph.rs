//! Instantiate a blinder topology inside a GStreamer pipeline.

use blinder_types::{GraphTopology, NodeKind, TopologyLink, TopologyNode};
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info};

use crate::error::BlinderError;

/// Create every topology node in `pipeline` and link it up.
///
/// The upstream producers named by the topology must already be in the
/// pipeline; they are linked into their queues through request pads, so
/// tees are the natural producer outputs.
pub fn instantiate(
    topology: &GraphTopology,
    pipeline: &gst::Pipeline,
) -> Result<(), BlinderError> {
    for upstream in &topology.upstream {
        if pipeline.by_name(upstream).is_none() {
            return Err(BlinderError::UpstreamNotFound(upstream.clone()));
        }
    }

    for node in &topology.nodes {
        let element = make_element(node)?;
        pipeline.add(&element)?;
    }
    info!(
        "Created {} blinder elements for {} mix buses",
        topology.nodes.len(),
        topology.buses.len()
    );

    // Request mixer pads by exact name so pad N always carries the same input
    for bus in &topology.buses {
        let mixer = pipeline
            .by_name(&bus.name)
            .ok_or_else(|| BlinderError::BusNotFound(bus.name.clone()))?;
        for pad in &bus.pads {
            let name = pad.pad_name();
            mixer.request_pad_simple(&name).ok_or_else(|| {
                BlinderError::ElementCreation(format!(
                    "Failed to request pad {} on {}",
                    name, bus.name
                ))
            })?;
        }
    }

    for link in &topology.links {
        link_elements(pipeline, link)?;
    }
    debug!("Linked {} blinder edges", topology.links.len());

    Ok(())
}

fn make_element(node: &TopologyNode) -> Result<gst::Element, BlinderError> {
    let factory = node.kind.factory_name();
    let element = gst::ElementFactory::make(factory)
        .name(&node.name)
        .build()
        .map_err(|e| {
            BlinderError::ElementCreation(format!("{} {}: {}", factory, node.name, e))
        })?;

    match &node.kind {
        NodeKind::CapsFilter { caps } => {
            let caps = caps.parse::<gst::Caps>().map_err(|_| {
                BlinderError::InvalidConfiguration(format!(
                    "Invalid caps for {}: {}",
                    node.name, caps
                ))
            })?;
            element.set_property("caps", &caps);
        }
        NodeKind::Queue => {
            element.set_property("flush-on-eos", true);
        }
        NodeKind::Tee => {
            element.set_property("allow-not-linked", true);
        }
        NodeKind::AudioMixer => {
            // Use first buffer's timestamp as start time
            element.set_property_from_str("start-time-selection", "first");
        }
        NodeKind::Compositor => {
            if element.has_property("background") {
                element.set_property_from_str("background", "black");
            }
        }
    }

    Ok(element)
}

fn link_elements(pipeline: &gst::Pipeline, link: &TopologyLink) -> Result<(), BlinderError> {
    let src = pipeline
        .by_name(&link.from.element)
        .ok_or_else(|| BlinderError::UpstreamNotFound(link.from.element.clone()))?;
    let sink = pipeline
        .by_name(&link.to.element)
        .ok_or_else(|| {
            BlinderError::ElementCreation(format!("{} not in pipeline", link.to.element))
        })?;

    src.link_pads(link.from.pad.as_deref(), &sink, link.to.pad.as_deref())
        .map_err(|e| {
            BlinderError::LinkError(format!("{} -> {}", link.from, link.to), e.to_string())
        })?;
    debug!("Linked {} -> {}", link.from, link.to);
    Ok(())
}
