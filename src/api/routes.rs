//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::extraction::{ExtractionClient, TaskExtractor};
use crate::llm::OpenAiClient;
use crate::store::TaskStore;

use super::tasks as tasks_api;
use super::transcripts as transcripts_api;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Extraction pipeline, shared by all requests
    pub extractor: TaskExtractor,
    /// Task database
    pub store: Arc<TaskStore>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm = Arc::new(OpenAiClient::with_base_url(
        config.openai_api_key.clone(),
        &config.openai_base_url,
    ));
    let extractor = TaskExtractor::new(ExtractionClient::new(llm, config.extraction_settings()));
    tracing::info!(
        "Extraction model {} ({} attempts, {:?} timeout)",
        config.model,
        config.max_retries,
        config.request_timeout
    );

    let store = Arc::new(TaskStore::open(&config.database_path)?);

    let state = Arc::new(AppState {
        config: config.clone(),
        extractor,
        store,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/healthz", get(health))
        .nest("/api/transcripts", transcripts_api::routes())
        .nest("/api/tasks", tasks_api::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Credentials rule out wildcard headers, so echo the requested ones.
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, draining connections");
}

#[derive(Debug, Serialize)]
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
