//! End-to-end scenarios through the public scoring facade and HTTP router, using the
//! shipped model artifact and deterministic stand-ins.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use riskflow::scoring::{
    scoring_router, BatchOutcome, BatchScorer, FeatureRow, FeatureValue, InferenceError,
    LogisticModel, ProbabilityModel, RiskPolicy, RiskTier, ScoringError, ScoringService,
    WorkerLimits, REQUIRED_FEATURES,
};

struct ConstantModel(f64);

impl ProbabilityModel for ConstantModel {
    fn predict_default(&self, _features: &FeatureRow) -> Result<f64, InferenceError> {
        Ok(self.0)
    }
}

fn shipped_model() -> LogisticModel {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/credit_model.json");
    LogisticModel::from_path(path).expect("shipped model loads")
}

fn applicant_json() -> Value {
    json!({
        "loan_amnt": 25000,
        "term": "60 months",
        "int_rate": 18.25,
        "installment": 638.2,
        "grade": "D",
        "sub_grade": "D3",
        "emp_length": "< 1 year",
        "home_ownership": "RENT",
        "annual_inc": 38000,
        "verification_status": "Not Verified",
        "purpose": "small_business",
        "dti": 29.7,
        "delinq_2yrs": 2,
        "inq_last_6mths": 4,
        "open_acc": 6,
        "pub_rec": 1,
        "revol_bal": 9800,
        "revol_util": 91.4,
        "total_acc": 11,
        "member_id": 77812
    })
}

fn applicant() -> FeatureRow {
    serde_json::from_value(applicant_json()).expect("applicant deserializes")
}

#[test]
fn shipped_model_scores_risky_applicant_consistently() {
    let service = ScoringService::new(Arc::new(shipped_model()), RiskPolicy::ScoreTable);

    let result = service.score(&applicant()).expect("applicant scores");

    assert!((0.0..=1.0).contains(&result.prob_default));
    assert!((1..=1000).contains(&result.score));
    assert!((1..=5).contains(&result.priority));
    assert_eq!(service.score(&applicant()).expect("rescore"), result);
}

#[test]
fn riskier_profile_never_scores_higher() {
    let service = ScoringService::new(Arc::new(shipped_model()), RiskPolicy::ScoreTable);
    let risky = service.score(&applicant()).expect("risky scores");

    let mut safer = applicant();
    safer.insert("grade", "A");
    safer.insert("sub_grade", "A1");
    safer.insert("int_rate", 6.5);
    safer.insert("dti", 8.0);
    safer.insert("delinq_2yrs", 0.0);
    safer.insert("pub_rec", 0.0);
    safer.insert("annual_inc", 120_000.0);
    safer.insert("emp_length", "10+ years");
    let safer = service.score(&safer).expect("safer scores");

    assert!(safer.prob_default <= risky.prob_default);
    assert!(safer.score >= risky.score);
}

#[test]
fn missing_grade_and_purpose_are_named() {
    let service = ScoringService::new(Arc::new(ConstantModel(0.1)), RiskPolicy::ScoreTable);
    let mut row = applicant();
    row.remove("grade");
    row.remove("purpose");

    match service.score(&row) {
        Err(ScoringError::MissingFeatures(missing)) => {
            let expected: BTreeSet<String> =
                ["grade".to_string(), "purpose".to_string()].into_iter().collect();
            assert_eq!(missing, expected);
        }
        other => panic!("expected missing features, got {other:?}"),
    }
}

#[test]
fn not_applicable_employment_length_still_scores() {
    let service = ScoringService::new(Arc::new(shipped_model()), RiskPolicy::ScoreTable);
    let mut row = applicant();
    row.insert("emp_length", "n/a");

    assert!(service.score(&row).is_ok());

    row.insert("emp_length", FeatureValue::Missing);
    assert!(service.score(&row).is_ok());
}

#[test]
fn high_risk_large_loan_gets_top_priority() {
    let service = ScoringService::new(Arc::new(ConstantModel(0.8)), RiskPolicy::ScoreTable);

    let result = service.score(&applicant()).expect("scores");

    assert_eq!(result.score, 200);
    assert_eq!(result.risk, RiskTier::High);
    assert_eq!(result.priority, 1);
}

#[test]
fn batch_and_live_scoring_agree() {
    let service = ScoringService::new(Arc::new(shipped_model()), RiskPolicy::ScoreTable);
    let header = REQUIRED_FEATURES.join(",");
    let csv = format!(
        "{header}\n25000,60 months,18.25,638.2,D,D3,< 1 year,RENT,38000,Not Verified,small_business,29.7,2,4,6,1,9800,91.4,11\n"
    );

    let report = BatchScorer::new(&service)
        .score_reader(csv.as_bytes())
        .expect("batch reads");
    let live = service.score(&applicant()).expect("live scores");

    assert_eq!(report.scored(), 1);
    assert_eq!(report.rows[0].outcome, BatchOutcome::Scored(live));
}

#[tokio::test]
async fn router_serves_scores_over_http() {
    let service = Arc::new(ScoringService::new(
        Arc::new(ConstantModel(0.3)),
        RiskPolicy::ProbabilityBands,
    ));
    let router = scoring_router(service, WorkerLimits::default());

    let response = router
        .oneshot(
            Request::post("/v1/score")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(applicant_json().to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(
        payload,
        json!({ "prob_default": 0.3, "score": 700, "risk": "MEDIUM", "priority": 3 })
    );
}
