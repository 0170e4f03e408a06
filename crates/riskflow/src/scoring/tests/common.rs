use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::scoring::features::FeatureRow;
use crate::scoring::model::{
    CategoricalTerm, InferenceError, LogisticModel, NumericTerm, ProbabilityModel,
};
use crate::scoring::risk::RiskPolicy;
use crate::scoring::router::{scoring_router, WorkerLimits};
use crate::scoring::service::ScoringService;

pub(super) fn applicant() -> FeatureRow {
    let mut row = FeatureRow::new();
    row.insert("loan_amnt", 25_000.0);
    row.insert("term", " 36 months");
    row.insert("int_rate", 13.49);
    row.insert("installment", 848.3);
    row.insert("grade", "C");
    row.insert("sub_grade", "C2");
    row.insert("emp_length", "10+ years");
    row.insert("home_ownership", "RENT");
    row.insert("annual_inc", 72_000.0);
    row.insert("verification_status", "Source Verified");
    row.insert("purpose", "debt_consolidation");
    row.insert("dti", 18.4);
    row.insert("delinq_2yrs", 0.0);
    row.insert("inq_last_6mths", 1.0);
    row.insert("open_acc", 9.0);
    row.insert("pub_rec", 0.0);
    row.insert("revol_bal", 14_250.0);
    row.insert("revol_util", 61.2);
    row.insert("total_acc", 22.0);
    row
}

pub(super) fn applicant_with_loan(loan_amount: f64) -> FeatureRow {
    let mut row = applicant();
    row.insert("loan_amnt", loan_amount);
    row
}

/// Deterministic stand-in for a fitted model.
pub(super) struct FixedProbability(pub(super) f64);

impl ProbabilityModel for FixedProbability {
    fn predict_default(&self, _features: &FeatureRow) -> Result<f64, InferenceError> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub(super) struct RecordingModel {
    pub(super) seen: Mutex<Vec<FeatureRow>>,
}

impl ProbabilityModel for RecordingModel {
    fn predict_default(&self, features: &FeatureRow) -> Result<f64, InferenceError> {
        self.seen
            .lock()
            .expect("recording mutex poisoned")
            .push(features.clone());
        Ok(0.1)
    }
}

pub(super) struct FailingModel;

impl ProbabilityModel for FailingModel {
    fn predict_default(&self, _features: &FeatureRow) -> Result<f64, InferenceError> {
        Err(InferenceError::NonNumeric {
            feature: "int_rate".to_string(),
            value: "thirteen".to_string(),
        })
    }
}

pub(super) struct UnloadedModel;

impl ProbabilityModel for UnloadedModel {
    fn predict_default(&self, _features: &FeatureRow) -> Result<f64, InferenceError> {
        Err(InferenceError::Unavailable("artifact not loaded".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

pub(super) struct SlowModel(pub(super) Duration);

impl ProbabilityModel for SlowModel {
    fn predict_default(&self, _features: &FeatureRow) -> Result<f64, InferenceError> {
        std::thread::sleep(self.0);
        Ok(0.5)
    }
}

pub(super) fn fixed_service(prob_default: f64) -> ScoringService<FixedProbability> {
    ScoringService::new(
        Arc::new(FixedProbability(prob_default)),
        RiskPolicy::ScoreTable,
    )
}

pub(super) fn router_with_model<M>(model: M, limits: WorkerLimits) -> axum::Router
where
    M: ProbabilityModel + 'static,
{
    let service = ScoringService::new(Arc::new(model), RiskPolicy::ScoreTable);
    scoring_router(Arc::new(service), limits)
}

/// Two numeric and two categorical terms; enough to exercise imputation and encoding.
pub(super) fn small_model() -> LogisticModel {
    LogisticModel {
        intercept: -2.0,
        numeric: vec![
            NumericTerm {
                name: "int_rate".to_string(),
                median: 12.0,
                coefficient: 0.1,
            },
            NumericTerm {
                name: "emp_length".to_string(),
                median: 5.0,
                coefficient: -0.1,
            },
        ],
        categorical: vec![
            CategoricalTerm {
                name: "grade".to_string(),
                most_frequent: "b".to_string(),
                levels: BTreeMap::from([("a".to_string(), -0.5), ("b".to_string(), 0.0)]),
            },
            CategoricalTerm {
                name: "term".to_string(),
                most_frequent: "36 months".to_string(),
                levels: BTreeMap::from([
                    ("36 months".to_string(), 0.0),
                    ("60 months".to_string(), 0.4),
                ]),
            },
        ],
    }
}

pub(super) fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// A tracing event recorded by [`capture_events`], with every field rendered as text.
#[derive(Debug, Clone)]
pub(super) struct CapturedEvent {
    pub(super) level: Level,
    pub(super) fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub(super) fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }

    pub(super) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = FieldRecorder::default();
        event.record(&mut recorder);
        self.events
            .lock()
            .expect("capture mutex poisoned")
            .push(CapturedEvent {
                level: *event.metadata().level(),
                fields: recorder.0,
            });
    }
}

#[derive(Default)]
struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Run `f` with a thread-local subscriber and return what it logged.
pub(super) fn capture_events<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    let output = tracing::subscriber::with_default(subscriber, f);
    let events = capture
        .events
        .lock()
        .expect("capture mutex poisoned")
        .clone();
    (output, events)
}
