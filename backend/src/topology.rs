//! Topology builder for the blinder.
//!
//! Turns the configured filler sources into a [`GraphTopology`]:
//!
//! ```text
//! video-mix ─────────────► queue ─► sink_0 ┐
//! video-blinder-<name> ──► queue ─► sink_i ┴► compositor-blinder-mix ─► capsfilter ─► video-mix-blinded (tee)
//!
//! (same shape for compositor-blinder-slides when a secondary bus is configured)
//!
//! audio-mix ─────► queue ─► sink_0 ┐
//! audio-blinder ─► queue ─► sink_1 ┴► audiomixer-blinder ─► capsfilter ─► audio-mix-blinded (tee)
//! ```
//!
//! The builder is pure: it only looks at [`BlinderSettings`] and never touches
//! a running pipeline.

use blinder_types::selection::LIVE_KEYWORD;
use blinder_types::{
    BusKind, BusPad, BusRole, FillerSource, GraphTopology, MixBusSpec, NodeKind, PadFeed, PadRef,
    TopologyLink, TopologyNode,
};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::BlinderError;

/// Upstream producer of the live program video.
pub const LIVE_VIDEO: &str = "video-mix";
/// Upstream producer of the live program audio.
pub const LIVE_AUDIO: &str = "audio-mix";
/// Upstream producer of the shared filler audio.
pub const FILLER_AUDIO: &str = "audio-blinder";

pub const PRIMARY_BUS: &str = "compositor-blinder-mix";
pub const SECONDARY_BUS: &str = "compositor-blinder-slides";
pub const AUDIO_BUS: &str = "audiomixer-blinder";

pub const PRIMARY_OUTPUT: &str = "video-mix-blinded";
pub const SECONDARY_OUTPUT: &str = "video-slides-blinded";
pub const AUDIO_OUTPUT: &str = "audio-mix-blinded";

/// Default raw video caps used when none are configured.
pub const DEFAULT_VIDEO_CAPS: &str = "video/x-raw,format=I420,width=1920,height=1080,framerate=25/1,pixel-aspect-ratio=1/1";
/// Default raw audio caps used when none are configured.
pub const DEFAULT_AUDIO_CAPS: &str = "audio/x-raw,format=S16LE,channels=2,layout=interleaved,rate=48000";

/// Everything the topology builder needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BlinderSettings {
    /// Filler source names, in pad order.
    pub sources: Vec<String>,
    /// Whether a secondary video bus exists.
    pub secondary: bool,
    /// Video caps, passed through verbatim.
    pub video_caps: String,
    /// Audio caps, passed through verbatim.
    pub audio_caps: String,
    /// Default gain of the filler audio producer.
    pub volume: f64,
}

impl Default for BlinderSettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            secondary: false,
            video_caps: DEFAULT_VIDEO_CAPS.to_string(),
            audio_caps: DEFAULT_AUDIO_CAPS.to_string(),
            volume: 1.0,
        }
    }
}

/// Name of the upstream video producer of a filler source.
pub fn filler_video_upstream(name: &str) -> String {
    format!("video-blinder-{}", name)
}

/// Validate filler source names and assign their ordinals.
///
/// Names become part of element names and are accepted as operator input,
/// so they must be non-empty, free of whitespace, `:` and `/`, must not be
/// a plain number or the `live` keyword, and must be unique.
pub fn validate_fillers(names: &[String]) -> Result<Vec<FillerSource>, BlinderError> {
    let mut seen = HashSet::new();
    let mut fillers = Vec::with_capacity(names.len());

    for (index, name) in names.iter().enumerate() {
        let invalid = name.is_empty()
            || name
                .chars()
                .any(|c| c.is_whitespace() || c == ':' || c == '/')
            || name.parse::<usize>().is_ok()
            || name.eq_ignore_ascii_case(LIVE_KEYWORD);
        if invalid {
            return Err(BlinderError::InvalidFillerName(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(BlinderError::DuplicateFillerName(name.clone()));
        }
        fillers.push(FillerSource {
            name: name.clone(),
            index,
        });
    }

    Ok(fillers)
}

/// Build the blinder graph description.
pub fn build_topology(settings: &BlinderSettings) -> Result<GraphTopology, BlinderError> {
    let fillers = validate_fillers(&settings.sources)?;
    info!(
        "Configuring blinder with {} video filler source(s){}",
        fillers.len(),
        if settings.secondary {
            " and a secondary bus"
        } else {
            ""
        }
    );

    let mut topology = GraphTopology {
        fillers: fillers.clone(),
        nodes: Vec::new(),
        buses: Vec::new(),
        links: Vec::new(),
        upstream: Vec::new(),
    };

    add_video_bus(
        &mut topology,
        PRIMARY_BUS,
        BusRole::Primary,
        PRIMARY_OUTPUT,
        &settings.video_caps,
    );
    if settings.secondary {
        add_video_bus(
            &mut topology,
            SECONDARY_BUS,
            BusRole::Secondary,
            SECONDARY_OUTPUT,
            &settings.video_caps,
        );
    }
    add_audio_bus(&mut topology, &settings.audio_caps);

    debug!(
        "Blinder topology: {} nodes, {} buses, {} links, {} upstream producers",
        topology.nodes.len(),
        topology.buses.len(),
        topology.links.len(),
        topology.upstream.len()
    );

    Ok(topology)
}

fn add_upstream(topology: &mut GraphTopology, name: &str) {
    if !topology.upstream.iter().any(|u| u == name) {
        topology.upstream.push(name.to_string());
    }
}

fn add_node(topology: &mut GraphTopology, name: &str, kind: NodeKind) {
    topology.nodes.push(TopologyNode {
        name: name.to_string(),
        kind,
    });
}

/// Add a queued input `upstream -> queue -> bus:sink_<index>` and return its pad.
fn add_input(
    topology: &mut GraphTopology,
    bus: &str,
    index: usize,
    feed: PadFeed,
    upstream: &str,
    queue: String,
) -> BusPad {
    add_upstream(topology, upstream);
    add_node(topology, &queue, NodeKind::Queue);

    let pad = BusPad {
        index,
        feed,
        queue,
        upstream: upstream.to_string(),
    };
    topology.links.push(TopologyLink::new(
        PadRef::element(upstream),
        PadRef::element(&pad.queue),
    ));
    topology.links.push(TopologyLink::new(
        PadRef::pad(&pad.queue, "src"),
        PadRef::pad(bus, pad.pad_name()),
    ));
    pad
}

/// Add `mixer -> capsfilter -> tee` for a bus.
fn add_mixer_chain(
    topology: &mut GraphTopology,
    bus: &str,
    mixer_kind: NodeKind,
    output: &str,
    caps: &str,
) {
    let caps_name = format!("{}-caps", bus);
    add_node(topology, bus, mixer_kind);
    add_node(
        topology,
        &caps_name,
        NodeKind::CapsFilter {
            caps: caps.to_string(),
        },
    );
    add_node(topology, output, NodeKind::Tee);

    topology.links.push(TopologyLink::new(
        PadRef::pad(bus, "src"),
        PadRef::pad(&caps_name, "sink"),
    ));
    topology.links.push(TopologyLink::new(
        PadRef::pad(&caps_name, "src"),
        PadRef::pad(output, "sink"),
    ));
}

fn add_video_bus(
    topology: &mut GraphTopology,
    bus: &str,
    role: BusRole,
    output: &str,
    caps: &str,
) {
    add_mixer_chain(topology, bus, NodeKind::Compositor, output, caps);

    let mut pads = Vec::with_capacity(topology.fillers.len() + 1);
    pads.push(add_input(
        topology,
        bus,
        0,
        PadFeed::Live,
        LIVE_VIDEO,
        format!("queue-{}-{}", LIVE_VIDEO, bus),
    ));

    for filler in topology.fillers.clone() {
        let upstream = filler_video_upstream(&filler.name);
        let queue = format!("queue-{}-{}", upstream, bus);
        pads.push(add_input(
            topology,
            bus,
            filler.index + 1,
            PadFeed::Filler {
                index: filler.index,
                name: filler.name,
            },
            &upstream,
            queue,
        ));
    }

    topology.buses.push(MixBusSpec {
        name: bus.to_string(),
        kind: BusKind::Video,
        role,
        pads,
        output: output.to_string(),
    });
}

fn add_audio_bus(topology: &mut GraphTopology, caps: &str) {
    add_mixer_chain(
        topology,
        AUDIO_BUS,
        NodeKind::AudioMixer,
        AUDIO_OUTPUT,
        caps,
    );

    let live = add_input(
        topology,
        AUDIO_BUS,
        0,
        PadFeed::Live,
        LIVE_AUDIO,
        format!("queue-{}", LIVE_AUDIO),
    );
    let filler = add_input(
        topology,
        AUDIO_BUS,
        1,
        PadFeed::CombinedFiller,
        FILLER_AUDIO,
        format!("queue-audio-blinded-{}", AUDIO_BUS),
    );

    topology.buses.push(MixBusSpec {
        name: AUDIO_BUS.to_string(),
        kind: BusKind::Audio,
        role: BusRole::Audio,
        pads: vec![live, filler],
        output: AUDIO_OUTPUT.to_string(),
    });
}
