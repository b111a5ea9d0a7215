//! Blinder backend library.
//!
//! This module exposes the application builder for use in tests.

use axum::http::{header, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod gst;
pub mod host;
pub mod openapi;
pub mod state;
pub mod switch;
pub mod topology;

use state::AppState;

/// Create the Axum application router with a given state.
///
/// This function is used both by the main server binary and by integration tests.
pub fn create_app_with_state(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/blinder", get(api::blinder::get_status))
        .route("/blinder/select", post(api::blinder::select))
        .route("/blinder/live", post(api::blinder::go_live))
        .route("/blinder/topology", get(api::blinder::get_topology))
        .route("/events", get(api::sse::events_stream));

    let swagger_router =
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi());

    Router::new()
        .route("/health", get(health))
        .merge(swagger_router)
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(Any),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}
