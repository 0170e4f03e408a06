use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::features::{
    missing_features, normalize_features, FeatureRow, LOAN_AMOUNT_FEATURE, REQUIRED_FEATURES,
};
use super::model::{InferenceError, ProbabilityModel};
use super::risk::{RiskPolicy, RiskTier};
use super::score::{compute_score, round_probability};

/// Outcome of scoring one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Probability of default rounded to four decimals.
    pub prob_default: f64,
    pub score: u16,
    pub risk: RiskTier,
    pub priority: u8,
}

/// Orchestrates contract validation, normalization, inference and the scoring rules.
///
/// Holds no mutable state: identical rows always produce identical results.
pub struct ScoringService<M> {
    model: Arc<M>,
    policy: RiskPolicy,
}

impl<M> ScoringService<M>
where
    M: ProbabilityModel,
{
    pub fn new(model: Arc<M>, policy: RiskPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> RiskPolicy {
        self.policy
    }

    /// Field names a request must supply.
    pub fn required_features(&self) -> &'static [&'static str] {
        &REQUIRED_FEATURES
    }

    /// Whether the probability model is loaded and able to serve.
    pub fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    pub fn score(&self, features: &FeatureRow) -> Result<ScoringResult, ScoringError> {
        let missing = missing_features(features);
        if !missing.is_empty() {
            return Err(ScoringError::MissingFeatures(missing));
        }

        let normalized = normalize_features(features);

        let loan_amount = normalized
            .number(LOAN_AMOUNT_FEATURE)
            .filter(|amount| amount.is_finite())
            .ok_or(ScoringError::InvalidLoanAmount)?;

        let prob_default = self.model.predict_default(&normalized).map_err(|err| {
            error!(error = %err, features = ?normalized, "probability model failed to score applicant");
            ScoringError::Inference(err)
        })?;

        let score = compute_score(prob_default);
        let assessment = self.policy.assess(prob_default, score, loan_amount);
        let result = ScoringResult {
            prob_default: round_probability(prob_default),
            score,
            risk: assessment.risk,
            priority: assessment.priority,
        };

        info!(
            prob_default = result.prob_default,
            score = result.score,
            risk = result.risk.label(),
            policy = self.policy.label(),
            "score generated"
        );

        Ok(result)
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("missing required features: {}", join_fields(.0))]
    MissingFeatures(BTreeSet<String>),
    #[error("feature 'loan_amnt' must be a finite number")]
    InvalidLoanAmount,
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ScoringError {
    /// Contract violations are the caller's to fix; everything else is internal.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScoringError::MissingFeatures(_) | ScoringError::InvalidLoanAmount
        )
    }
}

fn join_fields(fields: &BTreeSet<String>) -> String {
    fields.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
