//! Stand-in producers and consumers so a blinder graph can run on its own.
//!
//! In a full mixing engine the live program and the filler sources are
//! produced elsewhere. For standalone runs every upstream producer the
//! topology names is replaced by a test source:
//!
//! ```text
//! videotestsrc(pattern) → capsfilter → tee name=<upstream>
//! audiotestsrc(wave) → volume → capsfilter → tee name=<upstream>
//! ```
//!
//! and every bus output tee gets a queue and a fakesink.

use blinder_types::{BusKind, GraphTopology, PadFeed};
use gstreamer as gst;
use gstreamer::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::BlinderError;
use crate::topology::BlinderSettings;

/// Patterns cycled through for filler video sources.
const FILLER_PATTERNS: &[&str] = &["black", "smpte", "snow", "ball", "white"];

/// What a stand-in producer has to generate.
#[derive(Debug, Clone, PartialEq)]
enum StandIn {
    Video { pattern: &'static str },
    Audio { wave: &'static str, volume: f64 },
}

fn stand_in_for(kind: BusKind, feed: &PadFeed, settings: &BlinderSettings) -> StandIn {
    match (kind, feed) {
        (BusKind::Video, PadFeed::Filler { index, .. }) => StandIn::Video {
            pattern: FILLER_PATTERNS[index % FILLER_PATTERNS.len()],
        },
        (BusKind::Video, _) => StandIn::Video { pattern: "smpte75" },
        (BusKind::Audio, PadFeed::Live) => StandIn::Audio {
            wave: "sine",
            volume: 1.0,
        },
        (BusKind::Audio, _) => StandIn::Audio {
            wave: "silence",
            volume: settings.volume,
        },
    }
}

fn make(factory: &str, name: &str) -> Result<gst::Element, BlinderError> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|e| BlinderError::ElementCreation(format!("{} {}: {}", factory, name, e)))
}

fn parse_caps(caps: &str) -> Result<gst::Caps, BlinderError> {
    caps.parse::<gst::Caps>()
        .map_err(|_| BlinderError::InvalidConfiguration(format!("Invalid caps: {}", caps)))
}

/// Add a test producer for every upstream name the topology references.
pub fn add_stand_in_sources(
    topology: &GraphTopology,
    settings: &BlinderSettings,
    pipeline: &gst::Pipeline,
) -> Result<(), BlinderError> {
    let mut added = HashSet::new();

    for bus in &topology.buses {
        for pad in &bus.pads {
            if !added.insert(pad.upstream.clone()) {
                continue;
            }
            let stand_in = stand_in_for(bus.kind, &pad.feed, settings);
            debug!("Stand-in for '{}': {:?}", pad.upstream, stand_in);

            let chain = match stand_in {
                StandIn::Video { pattern } => {
                    let src = make("videotestsrc", &format!("{}-src", pad.upstream))?;
                    src.set_property("is-live", true);
                    src.set_property_from_str("pattern", pattern);
                    let caps = make("capsfilter", &format!("{}-caps", pad.upstream))?;
                    caps.set_property("caps", parse_caps(&settings.video_caps)?);
                    vec![src, caps]
                }
                StandIn::Audio { wave, volume } => {
                    let src = make("audiotestsrc", &format!("{}-src", pad.upstream))?;
                    src.set_property("is-live", true);
                    src.set_property_from_str("wave", wave);
                    let gain = make("volume", &format!("{}-volume", pad.upstream))?;
                    gain.set_property("volume", volume);
                    let caps = make("capsfilter", &format!("{}-caps", pad.upstream))?;
                    caps.set_property("caps", parse_caps(&settings.audio_caps)?);
                    vec![src, gain, caps]
                }
            };

            let tee = make("tee", &pad.upstream)?;
            tee.set_property("allow-not-linked", true);

            let mut elements = chain;
            elements.push(tee);
            pipeline.add_many(&elements)?;
            gst::Element::link_many(&elements)?;
        }
    }

    info!("Added {} stand-in producers", added.len());
    Ok(())
}

/// Terminate every bus output in a fakesink.
///
/// Must run after [`super::instantiate`], which creates the output tees.
pub fn add_output_sinks(
    topology: &GraphTopology,
    pipeline: &gst::Pipeline,
) -> Result<(), BlinderError> {
    for bus in &topology.buses {
        let tee = pipeline
            .by_name(&bus.output)
            .ok_or_else(|| BlinderError::ElementCreation(format!("{} missing", bus.output)))?;
        let queue = make("queue", &format!("{}-sink-queue", bus.output))?;
        let sink = make("fakesink", &format!("{}-sink", bus.output))?;
        sink.set_property("sync", true);
        sink.set_property("async", false);

        pipeline.add_many([&queue, &sink])?;
        tee.link(&queue)?;
        queue.link(&sink)?;
    }
    Ok(())
}
