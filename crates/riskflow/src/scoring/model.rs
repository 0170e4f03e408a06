use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::features::{FeatureRow, FeatureValue};

/// Producer of default probabilities for a single normalized applicant row.
///
/// Implementations are loaded once and shared read-only across concurrent requests.
pub trait ProbabilityModel: Send + Sync {
    fn predict_default(&self, features: &FeatureRow) -> Result<f64, InferenceError>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// Failure raised while evaluating the model on a row.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("feature '{feature}' must be numeric, found '{value}'")]
    NonNumeric { feature: String, value: String },
    #[error("model produced a non-finite probability")]
    NonFinite,
    #[error("probability model unavailable: {0}")]
    Unavailable(String),
}

/// Failure raised while loading a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model parameter '{0}' is not finite")]
    NonFiniteParameter(String),
    #[error("feature '{0}' declared more than once")]
    DuplicateFeature(String),
}

/// Numeric input: missing values take the training median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTerm {
    pub name: String,
    pub median: f64,
    pub coefficient: f64,
}

/// One-hot encoded input: missing values take the most frequent training level and
/// levels unseen during training contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalTerm {
    pub name: String,
    pub most_frequent: String,
    pub levels: BTreeMap<String, f64>,
}

impl CategoricalTerm {
    fn contribution(&self, level: &str) -> f64 {
        self.levels.get(level).copied().unwrap_or(0.0)
    }
}

/// Logistic regression exported from the training pipeline together with its imputation
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    #[serde(default)]
    pub numeric: Vec<NumericTerm>,
    #[serde(default)]
    pub categorical: Vec<CategoricalTerm>,
}

impl LogisticModel {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelLoadError> {
        let model: Self = serde_json::from_reader(reader)?;
        model.validate()?;
        Ok(model)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .map(|term| term.name.as_str())
            .chain(self.categorical.iter().map(|term| term.name.as_str()))
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        if !self.intercept.is_finite() {
            return Err(ModelLoadError::NonFiniteParameter("intercept".to_string()));
        }

        for term in &self.numeric {
            if !term.median.is_finite() {
                return Err(ModelLoadError::NonFiniteParameter(format!(
                    "{}.median",
                    term.name
                )));
            }
            if !term.coefficient.is_finite() {
                return Err(ModelLoadError::NonFiniteParameter(format!(
                    "{}.coefficient",
                    term.name
                )));
            }
        }

        for term in &self.categorical {
            if let Some((level, _)) = term.levels.iter().find(|(_, weight)| !weight.is_finite()) {
                return Err(ModelLoadError::NonFiniteParameter(format!(
                    "{}.{}",
                    term.name, level
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for name in self.feature_names() {
            if !seen.insert(name) {
                return Err(ModelLoadError::DuplicateFeature(name.to_string()));
            }
        }

        Ok(())
    }

    fn linear_predictor(&self, features: &FeatureRow) -> Result<f64, InferenceError> {
        let mut total = self.intercept;

        for term in &self.numeric {
            let value = match features.get(&term.name) {
                Some(FeatureValue::Number(value)) if value.is_finite() => *value,
                Some(FeatureValue::Text(text)) => {
                    return Err(InferenceError::NonNumeric {
                        feature: term.name.clone(),
                        value: text.clone(),
                    })
                }
                _ => term.median,
            };
            total += term.coefficient * value;
        }

        for term in &self.categorical {
            total += match features.get(&term.name) {
                Some(FeatureValue::Text(level)) => term.contribution(level),
                Some(FeatureValue::Number(value)) => term.contribution(&value.to_string()),
                Some(FeatureValue::Missing) | None => term.contribution(&term.most_frequent),
            };
        }

        Ok(total)
    }
}

impl ProbabilityModel for LogisticModel {
    fn predict_default(&self, features: &FeatureRow) -> Result<f64, InferenceError> {
        let probability = sigmoid(self.linear_predictor(features)?);
        if probability.is_finite() {
            Ok(probability)
        } else {
            Err(InferenceError::NonFinite)
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
