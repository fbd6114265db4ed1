//! Integration tests for the HTTP endpoints
//!
//! Tests cover:
//! - GET /health
//! - POST /api/calculate-taxes: success, missing fields, malformed body, exhausted attempts

#![cfg(feature = "server")]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use paycheck_recon::api::{build_router, AppState};
use paycheck_recon::{
    PaycheckError, RawLine, ReconciliationEngine, RetryController, SessionLease, SourceAdapter,
    SourceBinding, SourceKind, TaxRequest,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test adapter: always returns the same lines, or always fails
struct FixedAdapter {
    source: SourceKind,
    lines: Option<Vec<RawLine>>,
    calls: AtomicU32,
}

impl FixedAdapter {
    fn ok(source: SourceKind, lines: Vec<RawLine>) -> Arc<Self> {
        Arc::new(FixedAdapter {
            source,
            lines: Some(lines),
            calls: AtomicU32::new(0),
        })
    }

    fn failing(source: SourceKind) -> Arc<Self> {
        Arc::new(FixedAdapter {
            source,
            lines: None,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    fn source(&self) -> SourceKind {
        self.source
    }

    async fn fetch(
        &self,
        _session: &mut SessionLease<'_>,
        _request: &TaxRequest,
    ) -> paycheck_recon::Result<Vec<RawLine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lines
            .clone()
            .ok_or_else(|| PaycheckError::acquisition(self.source, "navigation timeout"))
    }
}

fn payroll_lines() -> Vec<RawLine> {
    vec![
        RawLine::new("Take home pay (net pay)", "$47,527.50"),
        RawLine::new("Federal Withholding", "$9,000.00"),
        RawLine::new("State Tax Withholding", "$3,500.00"),
        RawLine::new("Medicare", "$942.50"),
        RawLine::new("Social Security", "$4,030.00"),
    ]
}

fn consumer_lines() -> Vec<RawLine> {
    vec![
        RawLine::new("Federal Withholding", "$9,000.00"),
        RawLine::new("State Tax Withholding", "$3,500.00"),
        RawLine::new("City Tax", "$0.00"),
        RawLine::new("FICA", "$4,972.50"),
        RawLine::new("Net Pay", "$47,527.50"),
    ]
}

fn setup_app(payroll: Arc<FixedAdapter>, consumer: Arc<FixedAdapter>) -> axum::Router {
    let controller = RetryController::new(
        SourceBinding::with_default_vocabulary(payroll),
        SourceBinding::with_default_vocabulary(consumer),
        ReconciliationEngine::with_tolerance(1.5),
    );
    build_router(AppState::new(controller))
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/calculate-taxes")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

const FULL_BODY: &str = r#"{
    "salary": 65000,
    "state": "Texas",
    "address": "1 Main St",
    "city": "Austin",
    "zipcode": "73301",
    "filingStatus": "SINGLE"
}"#;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(
        FixedAdapter::ok(SourceKind::Payroll, payroll_lines()),
        FixedAdapter::ok(SourceKind::Consumer, consumer_lines()),
    );

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
}

// =============================================================================
// Calculate taxes
// =============================================================================

#[tokio::test]
async fn test_calculate_taxes_success() {
    let payroll = FixedAdapter::ok(SourceKind::Payroll, payroll_lines());
    let consumer = FixedAdapter::ok(SourceKind::Consumer, consumer_lines());
    let app = setup_app(payroll.clone(), consumer.clone());

    let response = app.oneshot(post_json(FULL_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["taxDetails"]["Federal Withholding"], 9000.0);
    assert_eq!(body["taxDetails"]["City Tax"], 0.0);
    assert_eq!(body["taxDetails"]["Other"], 0.0);
    assert_eq!(body["percentages"]["State Tax Withholding"], "5.38%");
    assert_eq!(body["deviations"]["FICA"], 0.0);
    assert!(body["requestId"].is_string());
    assert_eq!(payroll.calls.load(Ordering::SeqCst), 1);
    assert_eq!(consumer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_calculate_taxes_missing_fields() {
    let payroll = FixedAdapter::ok(SourceKind::Payroll, payroll_lines());
    let app = setup_app(payroll.clone(), FixedAdapter::ok(SourceKind::Consumer, consumer_lines()));

    let response = app
        .oneshot(post_json(r#"{"salary": 65000, "state": "Texas"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(body["requiredFields"].as_array().unwrap().len(), 6);
    let missing: Vec<&str> = body["missingFields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(missing, vec!["address", "city", "zipcode", "filingStatus"]);
    // No acquisition happens for a rejected request
    assert_eq!(payroll.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_calculate_taxes_malformed_body() {
    let app = setup_app(
        FixedAdapter::ok(SourceKind::Payroll, payroll_lines()),
        FixedAdapter::ok(SourceKind::Consumer, consumer_lines()),
    );

    let response = app.oneshot(post_json("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calculate_taxes_unknown_filing_status() {
    let app = setup_app(
        FixedAdapter::ok(SourceKind::Payroll, payroll_lines()),
        FixedAdapter::ok(SourceKind::Consumer, consumer_lines()),
    );

    let body = FULL_BODY.replace("SINGLE", "WIDOWED");
    let response = app.oneshot(post_json(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calculate_taxes_exhausted_attempts() {
    let payroll = FixedAdapter::failing(SourceKind::Payroll);
    let app = setup_app(payroll.clone(), FixedAdapter::ok(SourceKind::Consumer, consumer_lines()));

    let response = app.oneshot(post_json(FULL_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to calculate taxes after multiple attempts");
    assert_eq!(body["attempts"], 3);
    assert_eq!(payroll.calls.load(Ordering::SeqCst), 3);
}
