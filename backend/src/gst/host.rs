//! [`GraphHost`] over a GStreamer pipeline.

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::trace;

use crate::error::BlinderError;
use crate::host::{GraphHost, MixBus};

/// Resolves mix buses by element name inside a pipeline.
#[derive(Debug, Clone)]
pub struct GstGraphHost {
    pipeline: gst::Pipeline,
}

impl GstGraphHost {
    pub fn new(pipeline: gst::Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }
}

impl GraphHost for GstGraphHost {
    fn resolve_bus(&self, name: &str) -> Result<Box<dyn MixBus + '_>, BlinderError> {
        let mixer = self
            .pipeline
            .by_name(name)
            .ok_or_else(|| BlinderError::BusNotFound(name.to_string()))?;
        Ok(Box::new(GstMixBus { mixer }))
    }
}

/// A compositor or audiomixer element.
struct GstMixBus {
    mixer: gst::Element,
}

impl MixBus for GstMixBus {
    fn set_pad_gain(
        &self,
        pad_index: usize,
        property: &str,
        value: f64,
    ) -> Result<(), BlinderError> {
        let pad_name = format!("sink_{}", pad_index);
        let pad = self
            .mixer
            .static_pad(&pad_name)
            .ok_or_else(|| BlinderError::PadNotFound {
                bus: self.mixer.name().to_string(),
                pad: pad_name.clone(),
            })?;

        // set_property panics on unknown properties or mismatched types
        let pspec = pad.find_property(property).ok_or_else(|| {
            BlinderError::InvalidProperty(format!(
                "{} not found on {}:{}",
                property,
                self.mixer.name(),
                pad_name
            ))
        })?;
        if pspec.value_type() != f64::static_type() {
            return Err(BlinderError::InvalidProperty(format!(
                "{} on {}:{} is {}, expected gdouble",
                property,
                self.mixer.name(),
                pad_name,
                pspec.value_type().name()
            )));
        }

        pad.set_property(property, value);
        trace!("{}:{} {}={}", self.mixer.name(), pad_name, property, value);
        Ok(())
    }
}
