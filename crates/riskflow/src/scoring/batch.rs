use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::features::{FeatureRow, FeatureValue};
use super::model::ProbabilityModel;
use super::service::{ScoringResult, ScoringService};

/// Error raised when a batch file cannot be read or a report cannot be written.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to access batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid applicant CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Scored(ScoringResult),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    /// 1-based position of the data row, header excluded.
    pub row: usize,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<BatchRow>,
}

impl BatchReport {
    pub fn scored(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row.outcome, BatchOutcome::Scored(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.scored()
    }

    /// One line per input row: `row,status,prob_default,score,risk,priority,error`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BatchError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record([
            "row",
            "status",
            "prob_default",
            "score",
            "risk",
            "priority",
            "error",
        ])?;

        for entry in &self.rows {
            let row = entry.row.to_string();
            let record: [String; 7] = match &entry.outcome {
                BatchOutcome::Scored(result) => [
                    row,
                    "scored".to_string(),
                    format!("{:.4}", result.prob_default),
                    result.score.to_string(),
                    result.risk.label().to_string(),
                    result.priority.to_string(),
                    String::new(),
                ],
                BatchOutcome::Failed { error } => [
                    row,
                    "failed".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    error.clone(),
                ],
            };
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Scores every applicant in a CSV export through the same service as live requests.
///
/// The header row names the features and empty cells are missing values. Cells are read as
/// text and go through the same normalization as live requests. A row that fails to score is
/// reported, not fatal.
pub struct BatchScorer<'a, M> {
    service: &'a ScoringService<M>,
}

impl<'a, M> BatchScorer<'a, M>
where
    M: ProbabilityModel,
{
    pub fn new(service: &'a ScoringService<M>) -> Self {
        Self { service }
    }

    pub fn score_path(&self, path: impl AsRef<Path>) -> Result<BatchReport, BatchError> {
        let file = File::open(path)?;
        self.score_reader(file)
    }

    pub fn score_reader<R: Read>(&self, reader: R) -> Result<BatchReport, BatchError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = headers.iter().find(|name| !seen.insert(*name)) {
            return Err(BatchError::DuplicateColumn(duplicate.to_string()));
        }

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let features: FeatureRow = headers
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name, parse_cell(cell)))
                .collect();

            let outcome = match self.service.score(&features) {
                Ok(result) => BatchOutcome::Scored(result),
                Err(err) => BatchOutcome::Failed {
                    error: err.to_string(),
                },
            };
            rows.push(BatchRow {
                row: index + 1,
                outcome,
            });
        }

        let report = BatchReport {
            generated_at: Utc::now(),
            rows,
        };
        info!(
            rows = report.rows.len(),
            scored = report.scored(),
            failed = report.failed(),
            "batch scoring finished"
        );

        Ok(report)
    }
}

fn parse_cell(cell: &str) -> FeatureValue {
    if cell.trim().is_empty() {
        FeatureValue::Missing
    } else {
        FeatureValue::Text(cell.to_string())
    }
}
