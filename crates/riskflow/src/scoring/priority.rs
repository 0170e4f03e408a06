use serde::{Deserialize, Serialize};

use super::risk::{RiskTier, UnknownRiskTier};

/// Loan amounts at or above this value fall in the high bucket.
pub const HIGH_LOAN_AMOUNT: f64 = 20_000.0;
/// Loan amounts at or above this value (and below [`HIGH_LOAN_AMOUNT`]) fall in the medium bucket.
pub const MEDIUM_LOAN_AMOUNT: f64 = 10_000.0;

/// Most urgent priority.
pub const TOP_PRIORITY: u8 = 1;
/// Least urgent priority.
pub const BOTTOM_PRIORITY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanAmountBucket {
    High,
    Medium,
    Low,
}

impl LoanAmountBucket {
    pub const fn ordered() -> [Self; 3] {
        [Self::High, Self::Medium, Self::Low]
    }

    /// NaN amounts compare false against both thresholds and land in the low bucket.
    pub fn from_amount(loan_amount: f64) -> Self {
        if loan_amount >= HIGH_LOAN_AMOUNT {
            Self::High
        } else if loan_amount >= MEDIUM_LOAN_AMOUNT {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Dispatch priority from the risk/loan-size table; 1 is the most urgent.
///
/// | risk \ bucket | HIGH | MEDIUM | LOW |
/// |---------------|------|--------|-----|
/// | HIGH          | 1    | 2      | 3   |
/// | MEDIUM        | 2    | 3      | 4   |
/// | LOW           | 3    | 4      | 5   |
pub fn assign_priority(risk: RiskTier, loan_amount: f64) -> u8 {
    table_priority(risk, LoanAmountBucket::from_amount(loan_amount))
}

pub fn table_priority(risk: RiskTier, bucket: LoanAmountBucket) -> u8 {
    match (risk, bucket) {
        (RiskTier::High, LoanAmountBucket::High) => 1,
        (RiskTier::High, LoanAmountBucket::Medium) => 2,
        (RiskTier::High, LoanAmountBucket::Low) => 3,
        (RiskTier::Medium, LoanAmountBucket::High) => 2,
        (RiskTier::Medium, LoanAmountBucket::Medium) => 3,
        (RiskTier::Medium, LoanAmountBucket::Low) => 4,
        (RiskTier::Low, LoanAmountBucket::High) => 3,
        (RiskTier::Low, LoanAmountBucket::Medium) => 4,
        (RiskTier::Low, LoanAmountBucket::Low) => 5,
    }
}

/// Table lookup for a tier arriving as a label, e.g. from an upstream system.
pub fn priority_for_label(risk_label: &str, loan_amount: f64) -> Result<u8, UnknownRiskTier> {
    let risk = risk_label.parse::<RiskTier>()?;
    Ok(assign_priority(risk, loan_amount))
}

/// Fixed per-tier priority used by the probability band policy.
pub const fn band_priority(risk: RiskTier) -> u8 {
    match risk {
        RiskTier::Low => BOTTOM_PRIORITY,
        RiskTier::Medium => 3,
        RiskTier::High => TOP_PRIORITY,
    }
}
