//! Declarative description of the blinder mix graph.
//!
//! A [`GraphTopology`] names every element a host has to create, every mix
//! bus with its ordered input pads, and every link between them. It carries
//! no engine handles, so it can be built, compared and serialized without a
//! running pipeline.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A configured filler source. The index is its position in the configured
/// list and addresses mix-bus pad `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct FillerSource {
    pub name: String,
    pub index: usize,
}

/// Kind of element a topology node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Video compositor (per-pad `alpha`).
    Compositor,
    /// Audio mixer (per-pad `volume`).
    AudioMixer,
    /// Format restriction; the caps string is passed through untouched.
    CapsFilter { caps: String },
    /// Buffering stage decoupling a producer from a bus input.
    Queue,
    /// Fan-out point.
    Tee,
}

impl NodeKind {
    /// GStreamer factory name for this node kind.
    pub fn factory_name(&self) -> &'static str {
        match self {
            NodeKind::Compositor => "compositor",
            NodeKind::AudioMixer => "audiomixer",
            NodeKind::CapsFilter { .. } => "capsfilter",
            NodeKind::Queue => "queue",
            NodeKind::Tee => "tee",
        }
    }
}

/// An element the host has to instantiate under exactly this name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusKind {
    Video,
    Audio,
}

impl BusKind {
    /// Pad property carrying the gain for this kind of bus.
    pub fn gain_property(&self) -> &'static str {
        match self {
            BusKind::Video => "alpha",
            BusKind::Audio => "volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusRole {
    /// The program video mix.
    Primary,
    /// Optional second video mix, kept in the same gain state as the primary.
    Secondary,
    /// The program audio mix.
    Audio,
}

/// What feeds a bus input pad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PadFeed {
    /// The live program.
    Live,
    /// One filler source (video buses only).
    Filler { index: usize, name: String },
    /// The single shared filler audio producer (audio bus only).
    CombinedFiller,
}

/// Input pad `sink_<index>` of a mix bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusPad {
    pub index: usize,
    pub feed: PadFeed,
    /// Name of the queue node feeding this pad.
    pub queue: String,
    /// Name of the upstream producer feeding the queue.
    pub upstream: String,
}

impl BusPad {
    pub fn pad_name(&self) -> String {
        format!("sink_{}", self.index)
    }
}

/// A named mix bus and its ordered input pads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixBusSpec {
    /// Name of the mixer element.
    pub name: String,
    pub kind: BusKind,
    pub role: BusRole,
    pub pads: Vec<BusPad>,
    /// Name of the output tee consumers attach to.
    pub output: String,
}

/// Reference to an element, optionally narrowed to one of its pads.
///
/// A `None` pad means "let the element pick", which for tees requests a new
/// `src_%u` pad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRef {
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<String>,
}

impl PadRef {
    pub fn element(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            pad: None,
        }
    }

    pub fn pad(element: impl Into<String>, pad: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            pad: Some(pad.into()),
        }
    }
}

impl std::fmt::Display for PadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pad {
            Some(pad) => write!(f, "{}:{}", self.element, pad),
            None => write!(f, "{}", self.element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    pub from: PadRef,
    pub to: PadRef,
}

impl TopologyLink {
    pub fn new(from: PadRef, to: PadRef) -> Self {
        Self { from, to }
    }
}

/// Complete description of the blinder graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTopology {
    pub fillers: Vec<FillerSource>,
    pub nodes: Vec<TopologyNode>,
    pub buses: Vec<MixBusSpec>,
    pub links: Vec<TopologyLink>,
    /// Producers the host (or its collaborators) must provide by name.
    pub upstream: Vec<String>,
}

impl GraphTopology {
    pub fn bus(&self, name: &str) -> Option<&MixBusSpec> {
        self.buses.iter().find(|b| b.name == name)
    }

    pub fn bus_by_role(&self, role: BusRole) -> Option<&MixBusSpec> {
        self.buses.iter().find(|b| b.role == role)
    }

    pub fn node(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn video_buses(&self) -> impl Iterator<Item = &MixBusSpec> {
        self.buses.iter().filter(|b| b.kind == BusKind::Video)
    }

    pub fn has_secondary(&self) -> bool {
        self.bus_by_role(BusRole::Secondary).is_some()
    }
}
