use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Fields every scoring request must carry, in contract order.
pub const REQUIRED_FEATURES: [&str; 19] = [
    "loan_amnt",
    "term",
    "int_rate",
    "installment",
    "grade",
    "sub_grade",
    "emp_length",
    "home_ownership",
    "annual_inc",
    "verification_status",
    "purpose",
    "dti",
    "delinq_2yrs",
    "inq_last_6mths",
    "open_acc",
    "pub_rec",
    "revol_bal",
    "revol_util",
    "total_acc",
];

/// Contract fields carrying quantities. Text supplied for them is read as a number.
pub const NUMERIC_FEATURES: [&str; 12] = [
    "loan_amnt",
    "int_rate",
    "installment",
    "annual_inc",
    "dti",
    "delinq_2yrs",
    "inq_last_6mths",
    "open_acc",
    "pub_rec",
    "revol_bal",
    "revol_util",
    "total_acc",
];

pub const LOAN_AMOUNT_FEATURE: &str = "loan_amnt";
pub const EMPLOYMENT_LENGTH_FEATURE: &str = "emp_length";

/// A single cell of applicant data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FeatureValue::Missing)
    }
}

/// Flat mapping of feature name to value for one applicant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRow(BTreeMap<String, FeatureValue>);

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FeatureValue::as_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FeatureRow
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Required fields absent from the row. Keys match exactly; extra keys are ignored and a
/// key present with a missing value still counts as supplied.
pub fn missing_features(row: &FeatureRow) -> BTreeSet<String> {
    REQUIRED_FEATURES
        .iter()
        .filter(|name| !row.contains(name))
        .map(|name| name.to_string())
        .collect()
}

/// Bring a row into the shape the model was fitted on.
///
/// Text is trimmed and lower-cased, numeric fields given as text become numbers, and the
/// free-text employment length becomes a year count. This is the only transformation
/// applied before inference, whether the row came from JSON or CSV.
pub fn normalize_features(row: &FeatureRow) -> FeatureRow {
    row.iter()
        .map(|(name, value)| {
            let normalized = match value {
                FeatureValue::Text(text) if name == EMPLOYMENT_LENGTH_FEATURE => {
                    parse_employment_length(text).into()
                }
                FeatureValue::Text(text) if NUMERIC_FEATURES.contains(&name) => {
                    parse_numeric_text(text)
                }
                FeatureValue::Text(text) => FeatureValue::Text(text.trim().to_lowercase()),
                other => other.clone(),
            };
            (name, normalized)
        })
        .collect()
}

/// Blank and non-finite text is missing; text that is not a number is kept for the model
/// to reject.
fn parse_numeric_text(raw: &str) -> FeatureValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FeatureValue::Missing;
    }

    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => FeatureValue::Number(number),
        Ok(_) => FeatureValue::Missing,
        Err(_) => FeatureValue::Text(trimmed.to_lowercase()),
    }
}

/// Parse an employment length such as `"10+ years"` or `"< 1 year"` into whole years.
///
/// `n/a`, `none`, blank and anything unparseable yield `None`; the model imputes those.
pub fn parse_employment_length(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_lowercase();
    if matches!(lowered.as_str(), "" | "n/a" | "none") {
        return None;
    }

    let stripped = lowered
        .replace("years", "")
        .replace("year", "")
        .replace("< 1", "0")
        .replace("<1", "0")
        .replace('+', "");

    stripped.trim().parse::<i64>().ok().map(|years| years as f64)
}
