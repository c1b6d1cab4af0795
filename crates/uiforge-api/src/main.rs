// UIForge API server
// Decision: Without an LLM API key the server still starts; LLM-backed steps report a configuration error

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uiforge_api::{build_router, AppState, ServerConfig};
use uiforge_core::{
    LlmDriver, LlmSettings, OpenAIProtocolLlmDriver, SupervisorConfig, UnconfiguredLlmDriver,
};
use uiforge_storage::InMemorySessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "uiforge_api=debug,uiforge_worker=debug,uiforge_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("uiforge-api starting...");

    let server_config = ServerConfig::from_env();
    let llm_settings = LlmSettings::from_env();
    let supervisor_config = SupervisorConfig::from_env(&llm_settings);
    tracing::info!(
        llm = ?llm_settings,
        max_iterations = supervisor_config.max_iterations,
        "Generator configured"
    );

    let llm: Arc<dyn LlmDriver> = if llm_settings.is_configured() {
        Arc::new(
            OpenAIProtocolLlmDriver::from_settings(&llm_settings)
                .context("Failed to create LLM driver")?,
        )
    } else {
        tracing::warn!("No LLM API key configured (DEEPSEEK_API_KEY); LLM-backed steps will fail");
        Arc::new(UnconfiguredLlmDriver)
    };

    let store = Arc::new(InMemorySessionStore::new());
    let state = AppState::build(store, llm, &llm_settings, &supervisor_config);
    let adapter = state.adapter.clone();

    if !server_config.api_prefix.is_empty() {
        tracing::info!(prefix = %server_config.api_prefix, "API prefix configured");
    }
    if server_config.cors_allowed_origins.is_empty() {
        tracing::info!("CORS origins not configured; allowing any origin");
    } else {
        tracing::info!(origins = ?server_config.cors_allowed_origins, "CORS origins configured");
    }

    let app = build_router(state, &server_config);

    let addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    adapter.shutdown().await;
    tracing::info!("uiforge-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
