use crate::cli::ModelArgs;
use metrics_exporter_prometheus::PrometheusHandle;
use riskflow::config::{AppConfig, ScoringConfig};
use riskflow::error::AppError;
use riskflow::scoring::{LogisticModel, ScoringService};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type LiveService = ScoringService<LogisticModel>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load configuration from the environment, then apply command-line overrides.
pub(crate) fn load_config(overrides: &ModelArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    apply_model_overrides(&mut config.scoring, overrides);
    Ok(config)
}

pub(crate) fn apply_model_overrides(config: &mut ScoringConfig, overrides: &ModelArgs) {
    if let Some(path) = &overrides.model_path {
        config.model_path = path.clone();
    }
    if let Some(policy) = overrides.policy {
        config.policy = policy;
    }
}

/// Read the model artifact once and wrap it in a shareable service.
pub(crate) fn load_service(config: &ScoringConfig) -> Result<Arc<LiveService>, AppError> {
    let model = LogisticModel::from_path(&config.model_path)?;
    info!(
        path = %config.model_path.display(),
        features = model.feature_names().count(),
        policy = config.policy.label(),
        "model artifact loaded"
    );

    Ok(Arc::new(ScoringService::new(Arc::new(model), config.policy)))
}
