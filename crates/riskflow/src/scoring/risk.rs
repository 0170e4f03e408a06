use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::priority::{assign_priority, band_priority};

/// Scores at or above this value are low risk under the score table policy.
pub const LOW_RISK_MIN_SCORE: u16 = 700;
/// Scores at or above this value (and below [`LOW_RISK_MIN_SCORE`]) are medium risk.
pub const MEDIUM_RISK_MIN_SCORE: u16 = 400;
/// Probabilities at or below this value are low risk under the probability band policy.
pub const LOW_RISK_MAX_PROBABILITY: f64 = 0.2;
/// Probabilities at or below this value (and above [`LOW_RISK_MAX_PROBABILITY`]) are medium risk.
pub const MEDIUM_RISK_MAX_PROBABILITY: f64 = 0.5;

/// Coarse three-level classification of an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const fn ordered() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a risk tier label is not one of the recognized tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized risk tier '{0}'")]
pub struct UnknownRiskTier(pub String);

impl FromStr for RiskTier {
    type Err = UnknownRiskTier;

    /// Accepts the canonical labels and the legacy localized ones, ignoring case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "low" | "baixo" => Ok(Self::Low),
            "medium" | "medio" | "médio" => Ok(Self::Medium),
            "high" | "alto" => Ok(Self::High),
            _ => Err(UnknownRiskTier(raw.to_string())),
        }
    }
}

pub fn classify_by_score(score: u16) -> RiskTier {
    match score {
        s if s >= LOW_RISK_MIN_SCORE => RiskTier::Low,
        s if s >= MEDIUM_RISK_MIN_SCORE => RiskTier::Medium,
        _ => RiskTier::High,
    }
}

/// Classify straight from the probability of default. NaN falls through to high risk.
pub fn classify_by_probability(prob_default: f64) -> RiskTier {
    match prob_default {
        p if p <= LOW_RISK_MAX_PROBABILITY => RiskTier::Low,
        p if p <= MEDIUM_RISK_MAX_PROBABILITY => RiskTier::Medium,
        _ => RiskTier::High,
    }
}

/// The two rule sets for deriving risk and priority. They disagree for the same applicant
/// and are never blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPolicy {
    /// Score thresholds, then the risk/loan-size priority table.
    #[default]
    ScoreTable,
    /// Probability thresholds with one fixed priority per tier; loan size is ignored.
    ProbabilityBands,
}

impl RiskPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ScoreTable => "score_table",
            Self::ProbabilityBands => "probability_bands",
        }
    }

    pub fn assess(self, prob_default: f64, score: u16, loan_amount: f64) -> RiskAssessment {
        match self {
            Self::ScoreTable => {
                let risk = classify_by_score(score);
                RiskAssessment {
                    risk,
                    priority: assign_priority(risk, loan_amount),
                }
            }
            Self::ProbabilityBands => {
                let risk = classify_by_probability(prob_default);
                RiskAssessment {
                    risk,
                    priority: band_priority(risk),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized risk policy '{0}'")]
pub struct UnknownRiskPolicy(pub String);

impl FromStr for RiskPolicy {
    type Err = UnknownRiskPolicy;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "score_table" | "score" => Ok(Self::ScoreTable),
            "probability_bands" | "probability" => Ok(Self::ProbabilityBands),
            _ => Err(UnknownRiskPolicy(raw.to_string())),
        }
    }
}

impl fmt::Display for RiskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tier and priority produced by a policy for one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    pub risk: RiskTier,
    pub priority: u8,
}
