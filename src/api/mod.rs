//! HTTP API for submitting swaps, observing them, and health checks

use crate::chain::ChainProvider;
use crate::config::ApiConfig;
use crate::error::{SwapError, SwapResult};
use crate::state::{SwapRecord, SwapRegistry, SwapStats};
use crate::swap::{SwapInfo, SwapOrchestrator};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SwapRegistry>,
    pub orchestrator: Arc<SwapOrchestrator>,
    pub provider: Arc<ChainProvider>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/swaps", post(submit_swap))
        .route("/swaps/:id", get(get_swap))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> SwapResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwapError::Config(format!("cannot bind API on {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SwapError::Internal(e.to_string()))
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - the chain must be reachable
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let chain_id = state.provider.chain_id();
    let healthy = state.provider.health_check().await;
    crate::metrics::record_chain_health(chain_id, healthy);

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: healthy,
            chain_id,
        }),
    )
}

/// Accept a confirmed swap and run it in the background
async fn submit_swap(
    State(state): State<AppState>,
    Json(swap): Json<SwapInfo>,
) -> impl IntoResponse {
    let id = state.registry.register(swap.user_input.clone());
    info!(
        "Swap {} submitted: {} -> {}",
        id, swap.user_input.from_token, swap.user_input.to_token
    );

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.submit(id, swap).await;
    });

    (StatusCode::ACCEPTED, Json(SubmitResponse { id }))
}

/// Get one swap
async fn get_swap(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SwapRecord>, StatusCode> {
    state.registry.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Get swap counts per status
async fn get_stats(State(state): State<AppState>) -> Json<SwapStats> {
    Json(state.registry.get_stats())
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    chain_id: u64,
}

#[derive(Serialize)]
struct SubmitResponse {
    id: Uuid,
}
