// Thread HTTP routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uiforge_storage::{Checkpoint, HistoryEntry, ThreadMetadata, ThreadRecord, ThreadStatus};
use utoipa::ToSchema;

use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

// ============================================================================
// DTOs
// ============================================================================

/// Request to create a thread
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    /// Client-chosen id; an existing thread with this id is returned unchanged
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<ThreadMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    pub thread_id: String,
    #[schema(value_type = String, example = "idle")]
    pub status: ThreadStatus,
    #[schema(value_type = Object)]
    pub metadata: ThreadMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ThreadRecord> for ThreadResponse {
    fn from(thread: ThreadRecord) -> Self {
        Self {
            thread_id: thread.thread_id,
            status: thread.status,
            metadata: thread.metadata,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadStateResponse {
    pub thread_id: String,
    #[schema(value_type = Object)]
    pub values: Value,
    #[schema(value_type = Object)]
    pub metadata: ThreadMetadata,
    #[schema(value_type = Option<Object>)]
    pub checkpoint: Option<Checkpoint>,
}

impl From<ThreadRecord> for ThreadStateResponse {
    fn from(thread: ThreadRecord) -> Self {
        Self {
            values: thread.values_json(),
            thread_id: thread.thread_id,
            metadata: thread.metadata,
            checkpoint: thread.checkpoint,
        }
    }
}

/// Request to overwrite parts of a thread's state
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateThreadStateRequest {
    /// Partial values in the thread's state shape; unknown fields are rejected
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub values: Option<Value>,
    /// Node to resume from
    #[serde(default)]
    pub as_node: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckpointRef {
    pub checkpoint_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateThreadStateResponse {
    pub checkpoint: CheckpointRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryResponse {
    #[schema(value_type = Object)]
    pub checkpoint: Checkpoint,
    #[schema(value_type = Option<Object>)]
    pub parent_checkpoint: Option<Checkpoint>,
    #[schema(value_type = Object)]
    pub values: Value,
    #[schema(value_type = Object)]
    pub metadata: ThreadMetadata,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            checkpoint: entry.checkpoint,
            parent_checkpoint: entry.parent_checkpoint,
            values: entry
                .values
                .map(|values| values.to_json())
                .unwrap_or_else(|| json!({})),
            metadata: entry.metadata,
            created_at: entry.created_at,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/threads", post(create_thread))
        .route("/threads/:thread_id", get(get_thread))
        .route(
            "/threads/:thread_id/state",
            get(get_thread_state).post(update_thread_state),
        )
        .route("/threads/:thread_id/history", post(get_thread_history))
        .with_state(state)
}

/// POST /threads - Create a thread
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 200, description = "Thread created (or existing thread returned)", body = ThreadResponse)
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<AppState>,
    body: Option<Json<CreateThreadRequest>>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let thread = state
        .adapter
        .store()
        .create(req.thread_id, req.metadata)
        .await?;
    tracing::info!(thread_id = %thread.thread_id, "Thread created");
    Ok(Json(thread.into()))
}

/// GET /threads/{thread_id} - Get a thread
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread found", body = ThreadResponse),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let thread = state.adapter.store().get(&thread_id).await?;
    Ok(Json(thread.into()))
}

/// GET /threads/{thread_id}/state - Current values and checkpoint
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/state",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread state", body = ThreadStateResponse),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    tag = "threads"
)]
pub async fn get_thread_state(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadStateResponse>, ApiError> {
    let thread = state.adapter.store().get(&thread_id).await?;
    Ok(Json(thread.into()))
}

/// POST /threads/{thread_id}/state - Merge values and record a checkpoint
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/state",
    params(("thread_id" = String, Path, description = "Thread ID")),
    request_body = UpdateThreadStateRequest,
    responses(
        (status = 200, description = "State updated", body = UpdateThreadStateResponse),
        (status = 404, description = "Thread not found", body = ErrorResponse),
        (status = 422, description = "Values do not match the thread's state shape", body = ErrorResponse)
    ),
    tag = "threads"
)]
pub async fn update_thread_state(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(req): Json<UpdateThreadStateRequest>,
) -> Result<Json<UpdateThreadStateResponse>, ApiError> {
    let checkpoint = state
        .adapter
        .update_state(&thread_id, req.values, req.as_node)
        .await?;
    Ok(Json(UpdateThreadStateResponse {
        checkpoint: CheckpointRef {
            checkpoint_id: checkpoint.checkpoint_id,
        },
    }))
}

/// POST /threads/{thread_id}/history - Checkpoint snapshots, oldest first
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/history",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Checkpoint history", body = Vec<HistoryEntryResponse>),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    tag = "threads"
)]
pub async fn get_thread_history(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let history = state.adapter.store().history(&thread_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
