//! Blinder pipeline: assembly, start/stop and bus logging.

use blinder_types::GraphTopology;
use gstreamer as gst;
use gstreamer::prelude::*;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::graph::instantiate;
use super::host::GstGraphHost;
use super::sources::{add_output_sinks, add_stand_in_sources};
use crate::error::BlinderError;
use crate::topology::BlinderSettings;

/// A GStreamer pipeline carrying the blinder graph.
pub struct BlinderPipeline {
    pipeline: gst::Pipeline,
    bus_thread: Option<JoinHandle<()>>,
}

impl BlinderPipeline {
    /// Assemble a standalone pipeline: stand-in producers, the blinder
    /// graph, and fakesinks on every bus output.
    pub fn standalone(
        topology: &GraphTopology,
        settings: &BlinderSettings,
    ) -> Result<Self, BlinderError> {
        let pipeline = gst::Pipeline::builder().name("blinder").build();
        add_stand_in_sources(topology, settings, &pipeline)?;
        instantiate(topology, &pipeline)?;
        add_output_sinks(topology, &pipeline)?;
        info!("Assembled standalone blinder pipeline");

        Ok(Self {
            pipeline,
            bus_thread: None,
        })
    }

    /// Wrap a pipeline that already contains the blinder graph.
    pub fn from_pipeline(pipeline: gst::Pipeline) -> Self {
        Self {
            pipeline,
            bus_thread: None,
        }
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    /// Graph host for the switch controller.
    pub fn host(&self) -> Arc<GstGraphHost> {
        Arc::new(GstGraphHost::new(self.pipeline.clone()))
    }

    /// Set the pipeline to PLAYING and start logging its bus messages.
    pub fn start(&mut self) -> Result<(), BlinderError> {
        if self.bus_thread.is_none() {
            self.bus_thread = self.spawn_bus_logger();
        }

        info!("Setting pipeline '{}' to PLAYING", self.pipeline.name());
        match self.pipeline.set_state(gst::State::Playing) {
            Ok(gst::StateChangeSuccess::Success) => info!("Pipeline PLAYING"),
            Ok(gst::StateChangeSuccess::Async) => info!("Pipeline PLAYING (async)"),
            Ok(gst::StateChangeSuccess::NoPreroll) => info!("Pipeline PLAYING (live)"),
            Err(e) => {
                error!("Pipeline failed to start: {}", e);
                return Err(BlinderError::StateChange(format!(
                    "Failed to start: {}",
                    e
                )));
            }
        }
        Ok(())
    }

    /// Set the pipeline to NULL and wait for the bus logger to finish.
    pub fn stop(&mut self) -> Result<(), BlinderError> {
        info!("Stopping pipeline '{}'", self.pipeline.name());
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| BlinderError::StateChange(format!("Failed to stop: {}", e)))?;

        if let Some(bus) = self.pipeline.bus() {
            // Wakes the logger thread, which exits on its own message
            let _ = bus.post(gst::message::Application::new(gst::Structure::new_empty(
                "blinder-stop",
            )));
        }
        if let Some(handle) = self.bus_thread.take() {
            if handle.join().is_err() {
                warn!("Bus logger thread panicked");
            }
        }
        Ok(())
    }

    fn spawn_bus_logger(&self) -> Option<JoinHandle<()>> {
        let Some(bus) = self.pipeline.bus() else {
            error!(
                "Pipeline '{}' does not have a bus - cannot log messages",
                self.pipeline.name()
            );
            return None;
        };

        let spawned = std::thread::Builder::new()
            .name("blinder-bus".to_string())
            .spawn(move || {
                for msg in bus.iter_timed(gst::ClockTime::NONE) {
                    use gst::MessageView;

                    match msg.view() {
                        MessageView::Error(err) => {
                            error!(
                                "Pipeline error from {:?}: {} ({:?})",
                                err.src().map(|s| s.name()),
                                err.error(),
                                err.debug()
                            );
                        }
                        MessageView::Warning(w) => {
                            warn!(
                                "Pipeline warning from {:?}: {}",
                                w.src().map(|s| s.name()),
                                w.error()
                            );
                        }
                        MessageView::Eos(_) => info!("Pipeline reached end of stream"),
                        MessageView::Application(app) => {
                            if app.structure().is_some_and(|s| s.has_name("blinder-stop")) {
                                debug!("Bus logger stopping");
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn bus logger: {}", e);
                None
            }
        }
    }
}

impl Drop for BlinderPipeline {
    fn drop(&mut self) {
        if self.bus_thread.is_some() {
            if let Err(e) = self.stop() {
                warn!("Failed to stop pipeline on drop: {}", e);
            }
        }
    }
}
