use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use riskflow::scoring::{scoring_router, ProbabilityModel, ScoringService, WorkerLimits};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Scoring routes plus the operational endpoints that read [`AppState`].
pub(crate) fn with_scoring_routes<M>(
    service: Arc<ScoringService<M>>,
    limits: WorkerLimits,
) -> Router
where
    M: ProbabilityModel + 'static,
{
    scoring_router(service, limits)
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
