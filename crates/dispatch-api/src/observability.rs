//! Metrics and health listener, served on its own port: `/metrics` in
//! prometheus text format, `/healthz` liveness, `/readyz` storage
//! readiness.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use dispatch_core::{AssignmentRepository, ListFilters};

use crate::pipeline::metrics::ApiMetrics;

#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<ApiMetrics>,
    pub repo: Arc<dyn AssignmentRepository>,
}

pub fn router(metrics: Arc<ApiMetrics>, repo: Arc<dyn AssignmentRepository>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(ObservabilityState { metrics, repo })
}

async fn metrics_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode_text(),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Readiness is storage connectivity: one cheap read against the
/// repository.
async fn readyz(State(state): State<ObservabilityState>) -> StatusCode {
    let probe = ListFilters {
        page: 1,
        page_size: 1,
        status: None,
        driver_id: None,
    };
    match state.repo.list(&probe).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
