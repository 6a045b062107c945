//! HTTP transport for health results and Prometheus metrics.
//!
//! Paths follow the MicroProfile Health convention. A category that is
//! UP answers 200, DOWN answers 503, so orchestrators that only look at
//! the status code behave correctly without parsing the body.

use crate::metrics::MetricsRegistry;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use healthcheck::{AggregateResult, Category, HealthService, aggregator};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub service: HealthService,
    pub metrics: Arc<MetricsRegistry>,
}

/// Build the router exposing health and metrics endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(combined_handler))
        .route("/health/started", get(startup_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/:category", get(category_handler))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// HTTP server for health endpoints
pub struct HealthServer {
    state: AppState,
    listen_addr: String,
}

impl HealthServer {
    pub fn new(state: AppState, listen_addr: String) -> Self {
        Self { state, listen_addr }
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> common::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!(listen_addr = %self.listen_addr, "Starting health HTTP server");

        let app = router(self.state);
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Health server stopped");
        Ok(())
    }
}

/// Map an aggregate result onto an HTTP response
fn health_response(result: AggregateResult) -> Response {
    let code = if result.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(result)).into_response()
}

async fn evaluate(state: &AppState, category: Category) -> Response {
    let start = Instant::now();
    let result = state.service.evaluate(category).await;
    state.metrics.record_evaluation(category.as_str(), start.elapsed());
    state.metrics.record_result(category, &result);
    health_response(result)
}

/// Handler for /health: every category combined
async fn combined_handler(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let results = state.service.evaluate_all().await;
    state.metrics.record_evaluation("all", start.elapsed());

    for (category, result) in &results {
        state.metrics.record_result(*category, result);
    }

    let combined = aggregator::combine(results.into_values());
    state.metrics.set_status("all", combined.is_up());
    health_response(combined)
}

async fn startup_handler(State(state): State<AppState>) -> Response {
    evaluate(&state, Category::Startup).await
}

async fn liveness_handler(State(state): State<AppState>) -> Response {
    evaluate(&state, Category::Liveness).await
}

async fn readiness_handler(State(state): State<AppState>) -> Response {
    evaluate(&state, Category::Readiness).await
}

/// Handler for /health/{category}, accepting full names and aliases
async fn category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Response {
    match category.parse::<Category>() {
        Ok(category) => evaluate(&state, category).await,
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}
