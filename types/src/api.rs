//! API request and response types.

use crate::selection::{Selection, SelectionChoice};
use crate::topology::{BusRole, FillerSource, GraphTopology};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// ============================================================================
// Blinder API Types
// ============================================================================

/// Request to put a filler source (or the live program) on air.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SelectRequest {
    /// `"live"`, a filler ordinal, or a filler name
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "live"))]
    pub source: SelectionChoice,
}

/// Gains currently applied to one mix bus, indexed by pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BusGains {
    pub bus: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub role: BusRole,
    pub gains: Vec<f64>,
}

/// Current blinder state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BlinderStatusResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub selection: Selection,
    /// Name of the filler source on air, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_filler: Option<String>,
    pub fillers: Vec<FillerSource>,
    /// Whether the controller is bound to a running pipeline
    pub attached: bool,
    pub buses: Vec<BusGains>,
}

/// Result of a selection change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SelectResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub selection: Selection,
    /// Buses whose gains were written
    pub applied: Vec<String>,
    /// Buses or pads that could not be resolved on the running pipeline
    pub missing: Vec<String>,
}

/// The graph description the pipeline was assembled from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TopologyResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub topology: GraphTopology,
}

/// Generic error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
