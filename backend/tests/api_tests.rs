//! Integration tests for the Blinder API.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use blinder::create_app_with_state;
use blinder::host::MemoryGraphHost;
use blinder::state::AppState;
use blinder::topology::{build_topology, BlinderSettings, AUDIO_BUS, PRIMARY_BUS, SECONDARY_BUS};
use blinder_types::api::{BlinderStatusResponse, ErrorResponse, SelectResponse, TopologyResponse};
use blinder_types::Selection;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

/// Helper to create a test app backed by an in-memory graph host.
fn create_test_app() -> (Router, AppState, Arc<MemoryGraphHost>) {
    let settings = BlinderSettings {
        sources: vec!["slate".to_string(), "test-card".to_string()],
        secondary: true,
        ..Default::default()
    };
    let state = AppState::new(build_topology(&settings).unwrap());
    let host = Arc::new(MemoryGraphHost::from_topology(
        state.controller().topology(),
    ));
    state.controller().attach(host.clone());

    (create_app_with_state(state.clone()), state, host)
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_starts_blinded_on_first_filler() {
    let (app, _, host) = create_test_app();

    let response = app.oneshot(get("/api/blinder")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: BlinderStatusResponse = read_json(response).await;
    assert_eq!(status.selection, Selection::Blinded(0));
    assert_eq!(status.active_filler.as_deref(), Some("slate"));
    assert_eq!(status.fillers.len(), 2);
    assert!(status.attached);
    assert_eq!(status.buses.len(), 3);

    assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 1.0, 0.0]));
    assert_eq!(host.gains(SECONDARY_BUS), Some(vec![0.0, 1.0, 0.0]));
    assert_eq!(host.gains(AUDIO_BUS), Some(vec![0.0, 1.0]));
}

#[tokio::test]
async fn test_go_live() {
    let (app, state, host) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/blinder/live")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SelectResponse = read_json(response).await;
    assert_eq!(result.selection, Selection::Live);
    assert_eq!(result.applied.len(), 3);
    assert!(result.missing.is_empty());

    assert_eq!(state.controller().selection(), Selection::Live);
    assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0, 0.0, 0.0]));
    assert_eq!(host.gains(SECONDARY_BUS), Some(vec![1.0, 0.0, 0.0]));
    assert_eq!(host.gains(AUDIO_BUS), Some(vec![1.0, 0.0]));
}

#[tokio::test]
async fn test_select_by_ordinal() {
    let (app, _, host) = create_test_app();

    let response = app
        .oneshot(post_json("/api/blinder/select", json!({ "source": 1 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SelectResponse = read_json(response).await;
    assert_eq!(result.selection, Selection::Blinded(1));
    assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 0.0, 1.0]));
    assert_eq!(host.gains(AUDIO_BUS), Some(vec![0.0, 1.0]));
}

#[tokio::test]
async fn test_select_by_name() {
    let (app, state, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/blinder/select",
            json!({ "source": "test-card" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.controller().selection(), Selection::Blinded(1));
}

#[tokio::test]
async fn test_select_live_keyword() {
    let (app, state, _) = create_test_app();

    let response = app
        .oneshot(post_json("/api/blinder/select", json!({ "source": "live" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.controller().selection(), Selection::Live);
}

#[tokio::test]
async fn test_invalid_selection_leaves_state_unchanged() {
    let (app, state, host) = create_test_app();
    let writes_before = host.write_count();

    let response = app
        .clone()
        .oneshot(post_json("/api/blinder/select", json!({ "source": 7 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "Invalid selection");

    let response = app
        .oneshot(post_json(
            "/api/blinder/select",
            json!({ "source": "no-such-filler" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.controller().selection(), Selection::Blinded(0));
    assert_eq!(host.write_count(), writes_before);
    assert_eq!(host.gains(PRIMARY_BUS), Some(vec![0.0, 1.0, 0.0]));
}

#[tokio::test]
async fn test_missing_bus_reported_not_failed() {
    let (app, _, host) = create_test_app();
    assert!(host.remove_bus(SECONDARY_BUS));

    let response = app
        .oneshot(post_json("/api/blinder/select", json!({ "source": "live" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: SelectResponse = read_json(response).await;
    assert_eq!(result.applied, vec![PRIMARY_BUS, AUDIO_BUS]);
    assert_eq!(result.missing.len(), 1);
    assert!(result.missing[0].contains(SECONDARY_BUS));
    assert_eq!(host.gains(PRIMARY_BUS), Some(vec![1.0, 0.0, 0.0]));
}

#[tokio::test]
async fn test_topology() {
    let (app, _, _) = create_test_app();

    let response = app.oneshot(get("/api/blinder/topology")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: TopologyResponse = read_json(response).await;
    let topology = result.topology;
    assert_eq!(topology.buses.len(), 3);
    assert!(topology.bus(PRIMARY_BUS).is_some());
    assert!(topology.upstream.iter().any(|u| u == "video-blinder-slate"));
}

#[tokio::test]
async fn test_openapi_document() {
    let (app, _, _) = create_test_app();

    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc: serde_json::Value = read_json(response).await;
    assert!(doc["paths"]["/api/blinder/select"].is_object());
}
