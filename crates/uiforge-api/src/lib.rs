// UIForge HTTP API
//
// Routes:
// - GET  /health
// - POST /assistants/search, GET /assistants/:id[/graph|/schemas]
// - POST /threads, GET /threads/:id, GET|POST /threads/:id/state,
//   POST /threads/:id/history
// - POST /threads/:id/runs/stream (SSE)
//
// Health and Swagger UI are never prefixed; everything else is nested under
// the configured API prefix.

pub mod assistants;
pub mod common;
pub mod config;
pub mod runs;
pub mod threads;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uiforge_core::{LlmDriver, LlmSettings, SupervisorConfig};
use uiforge_storage::SessionStore;
use uiforge_worker::{AssistantRegistry, RunAdapter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::ServerConfig;

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub adapter: RunAdapter,
}

impl AppState {
    pub fn new(adapter: RunAdapter) -> Self {
        Self { adapter }
    }

    /// Wire the registry and run adapter over a store and an LLM driver
    pub fn build(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn LlmDriver>,
        settings: &LlmSettings,
        supervisor: &SupervisorConfig,
    ) -> Self {
        let registry = AssistantRegistry::new(llm, settings, supervisor);
        Self::new(RunAdapter::new(store, Arc::new(registry)))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        assistants::search_assistants,
        assistants::get_assistant,
        assistants::get_graph,
        assistants::get_schemas,
        threads::create_thread,
        threads::get_thread,
        threads::get_thread_state,
        threads::update_thread_state,
        threads::get_thread_history,
        runs::stream_run,
    ),
    components(
        schemas(
            common::ErrorResponse,
            assistants::SearchAssistantsRequest,
            assistants::AssistantDetail,
            uiforge_worker::AssistantSummary,
            uiforge_worker::GraphInfo,
            uiforge_worker::GraphNode,
            uiforge_worker::GraphEdge,
            uiforge_worker::GraphSchemas,
            threads::CreateThreadRequest,
            threads::ThreadResponse,
            threads::ThreadStateResponse,
            threads::UpdateThreadStateRequest,
            threads::UpdateThreadStateResponse,
            threads::CheckpointRef,
            threads::HistoryEntryResponse,
            runs::StreamRunRequest,
        )
    ),
    tags(
        (name = "assistants", description = "Published generator pipelines"),
        (name = "threads", description = "Thread state and checkpoint history"),
        (name = "runs", description = "Run execution with event streaming (SSE)")
    ),
    info(
        title = "UIForge API",
        version = "0.1.0",
        description = "Natural-language to UI generation with human review",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

/// Build router with optional API prefix
pub fn build_router_with_prefix(api_routes: Router, api_prefix: &str) -> Router {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

/// CORS for the configured origins, or permissive CORS when none are set
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
        ])
        .allow_credentials(true)
}

/// Full application router: health, prefixed API routes, Swagger UI, CORS, tracing
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .merge(assistants::routes(state.clone()))
        .merge(threads::routes(state.clone()))
        .merge(runs::routes(state));

    Router::new()
        .route("/health", get(health))
        .merge(build_router_with_prefix(api_routes, &config.api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_routes() -> Router {
        Router::new().route("/threads", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn test_api_prefix_empty() {
        let app = build_router_with_prefix(test_routes(), "");

        let response = app
            .oneshot(Request::builder().uri("/threads").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_api_prefix_set() {
        let app = build_router_with_prefix(test_routes(), "/api");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/threads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let response = app
            .oneshot(Request::builder().uri("/threads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_openapi_lists_run_stream() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/threads/{thread_id}/runs/stream"));
        assert!(doc.paths.paths.contains_key("/assistants/search"));
    }
}
