//! Server-Sent Events endpoint for real-time updates.

use axum::extract::State;
use axum::response::sse::Sse;
use futures::Stream;
use std::convert::Infallible;
use tracing::info;

use crate::state::AppState;

/// Subscribe to Server-Sent Events for blinder updates.
///
/// Opens with a `Resync` carrying the on-air selection, then streams a
/// JSON-encoded `BlinderEvent` whenever the selection changes, the controller
/// attaches to a pipeline, or a mix bus cannot be resolved.
///
/// Example usage from JavaScript:
/// ```javascript
/// const eventSource = new EventSource('http://localhost:8090/api/events');
/// eventSource.onmessage = (event) => {
///     const data = JSON.parse(event.data);
///     console.log('Blinder event:', data.type, data.data);
/// };
/// ```
pub async fn events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!(
        "New SSE client connected (total subscribers: {})",
        state.events().subscriber_count() + 1
    );
    state.events().subscribe()
}
