// Assistant HTTP routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uiforge_worker::{AssistantSummary, GraphInfo, GraphSchemas};
use utoipa::ToSchema;

use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

/// Filter for assistant search
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SearchAssistantsRequest {
    /// Only return assistants published under this graph id
    #[serde(default)]
    #[schema(example = "v0-generator")]
    pub graph_id: Option<String>,
}

/// Assistant summary with its graph
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssistantDetail {
    #[serde(flatten)]
    pub summary: AssistantSummary,
    pub graph: GraphInfo,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/assistants/search", post(search_assistants))
        .route("/assistants/:assistant_id", get(get_assistant))
        .route("/assistants/:assistant_id/graph", get(get_graph))
        .route("/assistants/:assistant_id/schemas", get(get_schemas))
        .with_state(state)
}

/// POST /assistants/search - List registered assistants
#[utoipa::path(
    post,
    path = "/assistants/search",
    request_body = SearchAssistantsRequest,
    responses(
        (status = 200, description = "Matching assistants", body = Vec<AssistantSummary>)
    ),
    tag = "assistants"
)]
pub async fn search_assistants(
    State(state): State<AppState>,
    body: Option<Json<SearchAssistantsRequest>>,
) -> Json<Vec<AssistantSummary>> {
    let filter = body.map(|Json(req)| req).unwrap_or_default();
    Json(
        state
            .adapter
            .registry()
            .search(filter.graph_id.as_deref()),
    )
}

/// GET /assistants/{assistant_id} - Assistant summary and graph
#[utoipa::path(
    get,
    path = "/assistants/{assistant_id}",
    params(("assistant_id" = String, Path, description = "Assistant ID")),
    responses(
        (status = 200, description = "Assistant found", body = AssistantDetail),
        (status = 404, description = "Assistant not found", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn get_assistant(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<Json<AssistantDetail>, ApiError> {
    let assistant = state.adapter.registry().get(&assistant_id)?;
    Ok(Json(AssistantDetail {
        summary: assistant.summary(),
        graph: assistant.graph(),
    }))
}

/// GET /assistants/{assistant_id}/graph - Node/edge view of the pipeline
#[utoipa::path(
    get,
    path = "/assistants/{assistant_id}/graph",
    params(("assistant_id" = String, Path, description = "Assistant ID")),
    responses(
        (status = 200, description = "Pipeline graph", body = GraphInfo),
        (status = 404, description = "Assistant not found", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn get_graph(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<Json<GraphInfo>, ApiError> {
    let assistant = state.adapter.registry().get(&assistant_id)?;
    Ok(Json(assistant.graph()))
}

/// GET /assistants/{assistant_id}/schemas - Input, output, state and config schemas
#[utoipa::path(
    get,
    path = "/assistants/{assistant_id}/schemas",
    params(("assistant_id" = String, Path, description = "Assistant ID")),
    responses(
        (status = 200, description = "Pipeline schemas", body = GraphSchemas),
        (status = 404, description = "Assistant not found", body = ErrorResponse)
    ),
    tag = "assistants"
)]
pub async fn get_schemas(
    State(state): State<AppState>,
    Path(assistant_id): Path<String>,
) -> Result<Json<GraphSchemas>, ApiError> {
    let assistant = state.adapter.registry().get(&assistant_id)?;
    Ok(Json(assistant.schemas()))
}
