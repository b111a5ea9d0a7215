//! The narrow interface the switch controller drives a running graph through.
//!
//! A host resolves a mix bus by name and sets a numeric gain property on one
//! of its input pads. [`MemoryGraphHost`] keeps the gains in memory and backs
//! dry runs; the GStreamer implementation lives in [`crate::gst::host`].

use blinder_types::GraphTopology;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::error::BlinderError;

/// A resolved mix bus.
pub trait MixBus {
    /// Set `property` on input pad `sink_<pad_index>`.
    fn set_pad_gain(&self, pad_index: usize, property: &str, value: f64)
        -> Result<(), BlinderError>;
}

/// A running graph that exposes mix buses by name.
pub trait GraphHost: Send + Sync {
    /// Resolve a mix bus, failing with [`BlinderError::BusNotFound`].
    fn resolve_bus(&self, name: &str) -> Result<Box<dyn MixBus + '_>, BlinderError>;
}

#[derive(Debug, Clone)]
struct MemoryBus {
    property: Option<String>,
    gains: Vec<f64>,
}

/// In-memory graph host.
///
/// Every pad starts at gain 1.0, like a freshly linked mixer pad.
#[derive(Debug, Default)]
pub struct MemoryGraphHost {
    buses: RwLock<HashMap<String, MemoryBus>>,
    writes: RwLock<usize>,
}

impl MemoryGraphHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host exposing every bus the topology declares.
    pub fn from_topology(topology: &GraphTopology) -> Self {
        let host = Self::new();
        for bus in &topology.buses {
            host.add_bus(&bus.name, bus.pads.len());
        }
        host
    }

    pub fn add_bus(&self, name: &str, pads: usize) {
        self.buses.write().insert(
            name.to_string(),
            MemoryBus {
                property: None,
                gains: vec![1.0; pads],
            },
        );
    }

    /// Drop a bus, as if it had been removed from the pipeline.
    pub fn remove_bus(&self, name: &str) -> bool {
        self.buses.write().remove(name).is_some()
    }

    pub fn gains(&self, name: &str) -> Option<Vec<f64>> {
        self.buses.read().get(name).map(|b| b.gains.clone())
    }

    /// Property name last written on a bus.
    pub fn property(&self, name: &str) -> Option<String> {
        self.buses
            .read()
            .get(name)
            .and_then(|b| b.property.clone())
    }

    /// Total number of pad writes so far.
    pub fn write_count(&self) -> usize {
        *self.writes.read()
    }
}

struct MemoryBusHandle<'a> {
    host: &'a MemoryGraphHost,
    name: String,
}

impl MixBus for MemoryBusHandle<'_> {
    fn set_pad_gain(
        &self,
        pad_index: usize,
        property: &str,
        value: f64,
    ) -> Result<(), BlinderError> {
        let mut buses = self.host.buses.write();
        let bus = buses
            .get_mut(&self.name)
            .ok_or_else(|| BlinderError::BusNotFound(self.name.clone()))?;
        let gain = bus
            .gains
            .get_mut(pad_index)
            .ok_or_else(|| BlinderError::PadNotFound {
                bus: self.name.clone(),
                pad: format!("sink_{}", pad_index),
            })?;
        *gain = value;
        bus.property = Some(property.to_string());
        *self.host.writes.write() += 1;
        debug!("{}:sink_{} {}={}", self.name, pad_index, property, value);
        Ok(())
    }
}

impl GraphHost for MemoryGraphHost {
    fn resolve_bus(&self, name: &str) -> Result<Box<dyn MixBus + '_>, BlinderError> {
        if !self.buses.read().contains_key(name) {
            return Err(BlinderError::BusNotFound(name.to_string()));
        }
        Ok(Box::new(MemoryBusHandle {
            host: self,
            name: name.to_string(),
        }))
    }
}
