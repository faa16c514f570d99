//! HTTP API gateway for cypherchat.
//!
//! - `GET  /health`: readiness and schema status
//! - `POST /ask`: stream the agent's reasoning and answer as NDJSON
//!
//! Built on Axum for high performance async HTTP.

pub mod ask;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use cypherchat_agent::{SessionCoordinator, initialize_agent};
use cypherchat_config::AppConfig;
use cypherchat_tools::Neo4jHttpStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub coordinator: Arc<SessionCoordinator>,
    pub schema_text: Option<String>,
    pub schema_error: Option<String>,
}

pub type SharedState = Arc<GatewayState>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub schema_loaded: bool,
    pub schema_error: Option<String>,
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask::ask_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// The schema is fetched once; if the graph is unreachable the server
/// still starts and `/health` reports the failure.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = cypherchat_providers::build_from_config(&config)?;
    let store = Arc::new(Neo4jHttpStore::from_config(&config.graph)?);
    let init = initialize_agent(provider, store, &config).await;

    let coordinator = SessionCoordinator::new(init.agent, &config.agent.default_conversation_id)
        .with_buffer(config.gateway.stream_buffer);
    let state = Arc::new(GatewayState {
        coordinator: Arc::new(coordinator),
        schema_text: init.schema_text,
        schema_error: init.schema_error.map(|e| e.to_string()),
    });

    let app = build_router(state);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        schema_loaded: state.schema_error.is_none(),
        schema_error: state.schema_error.clone(),
    })
}
