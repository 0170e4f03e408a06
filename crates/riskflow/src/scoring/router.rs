use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::features::{FeatureRow, REQUIRED_FEATURES};
use super::model::ProbabilityModel;
use super::service::{ScoringError, ScoringResult, ScoringService};
use crate::config::ScoringConfig;

/// Bounds on inference work run by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLimits {
    pub max_concurrent: usize,
    pub timeout: Duration,
}

impl From<&ScoringConfig> for WorkerLimits {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_scores,
            timeout: config.score_timeout,
        }
    }
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

/// Error raised while dispatching a scoring call onto the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("scoring deadline of {0:?} exceeded")]
    TimedOut(Duration),
    #[error("scoring worker pool is closed")]
    PoolClosed,
    #[error("scoring worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Shared handler state: the service plus the semaphore guarding the blocking pool.
pub struct ScoringState<M> {
    service: Arc<ScoringService<M>>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl<M> Clone for ScoringState<M> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            permits: self.permits.clone(),
            timeout: self.timeout,
        }
    }
}

impl<M> ScoringState<M>
where
    M: ProbabilityModel + 'static,
{
    pub fn new(service: Arc<ScoringService<M>>, limits: WorkerLimits) -> Self {
        Self {
            service,
            permits: Arc::new(Semaphore::new(
                limits.max_concurrent.clamp(1, Semaphore::MAX_PERMITS),
            )),
            timeout: limits.timeout,
        }
    }

    /// Score on tokio's blocking pool, waiting for a free slot, within the deadline.
    pub async fn dispatch(&self, features: FeatureRow) -> Result<ScoringResult, DispatchError> {
        match tokio::time::timeout(self.timeout, self.run(features)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::TimedOut(self.timeout)),
        }
    }

    async fn run(&self, features: FeatureRow) -> Result<ScoringResult, DispatchError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::PoolClosed)?;
        let service = self.service.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            service.score(&features)
        })
        .await?;

        Ok(outcome?)
    }
}

/// Router exposing scoring, feature-contract introspection and health.
pub fn scoring_router<M>(service: Arc<ScoringService<M>>, limits: WorkerLimits) -> Router
where
    M: ProbabilityModel + 'static,
{
    Router::new()
        .route("/v1/score", post(score_handler::<M>))
        .route("/v1/features", get(features_handler))
        .route("/health", get(health_handler::<M>))
        .with_state(ScoringState::new(service, limits))
}

pub(crate) async fn score_handler<M>(
    State(state): State<ScoringState<M>>,
    payload: Result<Json<FeatureRow>, JsonRejection>,
) -> Response
where
    M: ProbabilityModel + 'static,
{
    info!("scoring request received");

    let features = match payload {
        Ok(Json(features)) => features,
        Err(rejection) => {
            warn!(error = %rejection, "scoring request body rejected");
            let payload = json!({ "error": rejection.body_text() });
            return (rejection.status(), Json(payload)).into_response();
        }
    };

    match state.dispatch(features).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(DispatchError::Scoring(err)) if err.is_client_error() => {
            warn!(error = %err, "scoring request rejected");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(err @ (DispatchError::TimedOut(_) | DispatchError::PoolClosed)) => {
            warn!(error = %err, "scoring capacity unavailable");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "unexpected scoring error");
            let payload = json!({ "error": "internal scoring error" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn features_handler() -> Json<serde_json::Value> {
    Json(json!({ "required_features": REQUIRED_FEATURES }))
}

pub(crate) async fn health_handler<M>(State(state): State<ScoringState<M>>) -> Response
where
    M: ProbabilityModel + 'static,
{
    let model_loaded = state.service.is_ready();
    let status = if model_loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = json!({
        "status": if model_loaded { "ok" } else { "degraded" },
        "model_loaded": model_loaded,
    });
    (status, Json(payload)).into_response()
}
