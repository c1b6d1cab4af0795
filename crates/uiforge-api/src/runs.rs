// Run streaming HTTP route (SSE)
//
// Every generator event becomes one SSE frame: `event: <name>` with the JSON
// payload as data. The stream ends when the run task finishes. A client that
// disconnects early only drops the receiver; the run completes in the
// background and its state remains in the thread.

use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use uiforge_core::GeneratorEvent;
use uiforge_worker::RunRequest;
use utoipa::ToSchema;

use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

/// Request to start a streamed run
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StreamRunRequest {
    /// Assistant to run; the default assistant when omitted
    #[serde(default)]
    #[schema(example = "v0-generator-subgraphs")]
    pub assistant_id: Option<String>,
    /// Assistant-specific run input
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub input: Option<Value>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/threads/:thread_id/runs/stream", post(stream_run))
        .with_state(state)
}

/// Convert a generator event to an SSE frame
pub fn to_sse(event: &GeneratorEvent) -> SseEvent {
    SseEvent::default()
        .event(event.event_type())
        .data(event.payload().to_string())
}

/// POST /threads/{thread_id}/runs/stream - Start a run and stream its events
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/runs/stream",
    params(("thread_id" = String, Path, description = "Thread ID (created if missing)")),
    request_body = StreamRunRequest,
    responses(
        (status = 200, description = "Run event stream", content_type = "text/event-stream"),
        (status = 404, description = "Assistant not found", body = ErrorResponse),
        (status = 409, description = "A run is already in progress on this thread", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn stream_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    body: Option<Json<StreamRunRequest>>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let handle = state
        .adapter
        .start(RunRequest {
            thread_id,
            assistant_id: req.assistant_id,
            input: req.input.unwrap_or_else(|| json!({})),
        })
        .await?;

    tracing::info!(
        run_id = %handle.run_id,
        thread_id = %handle.thread_id,
        assistant_id = %handle.assistant_id,
        "Streaming run"
    );

    let stream = UnboundedReceiverStream::new(handle.events).map(|event| Ok(to_sse(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
