//! SSE progress stream for one run.
//!
//! Subscribes to the run's broadcast topic and frames every progress event
//! as a named SSE event. A `hello` event opens every subscription, and the
//! axum keep-alive sends `ping` comments to defeat idle-connection
//! timeouts. Lagged receivers skip the missed events and continue — the
//! stream is observability, not a source of truth.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use lexiport_core::types::DbId;
use lexiport_events::{names, ProgressEvent};

use crate::state::AppState;

/// Keep-alive interval for idle streams.
const KEEP_ALIVE_SECS: u64 = 15;

/// GET /api/v1/runs/{id}/stream
///
/// Live progress feed for a run, as `text/event-stream`. Keep-alives are
/// SSE comment frames (`: ping`), not named events — subscribers matching
/// on event names will never see a `ping` event and should let the
/// transport layer swallow comments.
pub async fn stream_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.bus.subscribe(id);
    tracing::debug!(run_id = id, "Progress stream opened");

    let hello = ProgressEvent::new(names::HELLO).with_payload(serde_json::json!({ "run_id": id }));
    let opening = stream::once(async move { Ok::<Event, Infallible>(to_sse(hello)) });

    let events = BroadcastStream::new(receiver).filter_map(move |result| async move {
        match result {
            Ok(event) => Some(Ok::<Event, Infallible>(to_sse(event))),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(run_id = id, skipped, "Progress stream lagged");
                None
            }
        }
    });

    Sse::new(opening.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text(names::PING),
    )
}

/// Frame a progress event: event name + JSON payload with timestamp.
fn to_sse(event: ProgressEvent) -> Event {
    let data = serde_json::json!({
        "payload": event.payload,
        "timestamp": event.timestamp,
    });
    Event::default()
        .event(event.event)
        .data(data.to_string())
}
