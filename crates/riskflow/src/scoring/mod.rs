//! Credit-risk scoring: the feature contract, normalization, model inference and the rules
//! that turn a probability of default into a score, a risk tier and a dispatch priority.

pub mod batch;
pub mod features;
pub mod model;
pub mod priority;
pub mod risk;
pub mod router;
pub mod score;
pub mod service;

#[cfg(test)]
mod tests;

pub use batch::{BatchError, BatchOutcome, BatchReport, BatchRow, BatchScorer};
pub use features::{
    missing_features, normalize_features, parse_employment_length, FeatureRow, FeatureValue,
    NUMERIC_FEATURES, REQUIRED_FEATURES,
};
pub use model::{
    CategoricalTerm, InferenceError, LogisticModel, ModelLoadError, NumericTerm, ProbabilityModel,
};
pub use priority::{assign_priority, priority_for_label, LoanAmountBucket};
pub use risk::{
    classify_by_probability, classify_by_score, RiskAssessment, RiskPolicy, RiskTier,
    UnknownRiskPolicy, UnknownRiskTier,
};
pub use router::{scoring_router, DispatchError, ScoringState, WorkerLimits};
pub use score::{compute_score, MAX_SCORE, MIN_SCORE};
pub use service::{ScoringError, ScoringResult, ScoringService};
