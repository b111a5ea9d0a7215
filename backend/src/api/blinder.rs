//! Blinder API handlers.

use axum::{extract::State, http::StatusCode, Json};
use blinder_types::api::{
    BlinderStatusResponse, ErrorResponse, SelectRequest, SelectResponse, TopologyResponse,
};
use blinder_types::SelectionChoice;
use tracing::{info, warn};
use utoipa;

use crate::error::BlinderError;
use crate::state::AppState;
use crate::switch::GainPushReport;

fn status(state: &AppState) -> BlinderStatusResponse {
    let controller = state.controller();
    BlinderStatusResponse {
        selection: controller.selection(),
        active_filler: controller.active_filler().map(|f| f.name.clone()),
        fillers: controller.fillers().to_vec(),
        attached: controller.is_attached(),
        buses: controller.bus_gains(),
    }
}

fn select_source(
    state: &AppState,
    choice: SelectionChoice,
) -> Result<Json<SelectResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Received blinder select request: source='{}'", choice);

    match state.controller().select(choice) {
        Ok(report) => Ok(Json(select_response(state, report))),
        Err(e @ (BlinderError::InvalidSelection { .. } | BlinderError::UnknownFiller(_))) => {
            warn!("Rejected blinder selection: {}", e);
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_details(
                    "Invalid selection",
                    e.to_string(),
                )),
            ))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_details(
                "Failed to change selection",
                e.to_string(),
            )),
        )),
    }
}

fn select_response(state: &AppState, report: GainPushReport) -> SelectResponse {
    SelectResponse {
        selection: state.controller().selection(),
        applied: report.applied,
        missing: report.missing.iter().map(|e| e.to_string()).collect(),
    }
}

/// Get the current blinder state.
#[utoipa::path(
    get,
    path = "/api/blinder",
    tag = "blinder",
    responses(
        (status = 200, description = "Current selection and bus gains", body = BlinderStatusResponse)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<BlinderStatusResponse> {
    Json(status(&state))
}

/// Put a filler source (or the live program) on air.
///
/// `source` is `"live"`, a filler ordinal or a filler name. Buses missing
/// from the running pipeline are reported in `missing` and do not fail the
/// request.
#[utoipa::path(
    post,
    path = "/api/blinder/select",
    tag = "blinder",
    request_body = SelectRequest,
    responses(
        (status = 200, description = "Selection changed", body = SelectResponse),
        (status = 400, description = "Invalid selection", body = ErrorResponse)
    )
)]
pub async fn select(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, (StatusCode, Json<ErrorResponse>)> {
    select_source(&state, req.source)
}

/// Take the live program back on air.
#[utoipa::path(
    post,
    path = "/api/blinder/live",
    tag = "blinder",
    responses(
        (status = 200, description = "Live program on air", body = SelectResponse)
    )
)]
pub async fn go_live(
    State(state): State<AppState>,
) -> Result<Json<SelectResponse>, (StatusCode, Json<ErrorResponse>)> {
    select_source(&state, SelectionChoice::Live)
}

/// Get the graph description the blinder was built from.
#[utoipa::path(
    get,
    path = "/api/blinder/topology",
    tag = "blinder",
    responses(
        (status = 200, description = "Blinder graph topology", body = TopologyResponse)
    )
)]
pub async fn get_topology(State(state): State<AppState>) -> Json<TopologyResponse> {
    Json(TopologyResponse {
        topology: state.controller().topology().clone(),
    })
}
