// 🌐 HTTP API - POST /api/calculate-taxes, GET /health

use crate::breakdown::TaxCategory;
use crate::error::PaycheckError;
use crate::reconciliation::ReconciliationResult;
use crate::request::{CalculateTaxesRequest, REQUIRED_FIELDS};
use crate::retry::{Reconciled, RetryController};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RetryController>,
}

impl AppState {
    pub fn new(controller: RetryController) -> Self {
        AppState {
            controller: Arc::new(controller),
        }
    }
}

/// Successful calculation body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownResponse {
    pub request_id: Uuid,
    /// Dollar amounts keyed by display label, plus "Other" (SDI + FLI)
    pub tax_details: BTreeMap<String, f64>,
    /// "x.xx%" of salary keyed by display label
    pub percentages: BTreeMap<String, String>,
    /// Percentage-point deviation between the sources per compared category
    pub deviations: BTreeMap<String, f64>,
    pub gap_filled: Vec<String>,
    pub attempts: u32,
}

impl BreakdownResponse {
    pub fn from_reconciled(request_id: Uuid, reconciled: &Reconciled) -> Self {
        let result = &reconciled.result;
        let mut tax_details = BTreeMap::new();
        let mut percentages = BTreeMap::new();

        for category in TaxCategory::ALL {
            let label = category.label().to_string();
            tax_details.insert(label.clone(), result.merged_breakdown.amount(category));
            let pct = result.merged_percentages.get(&category).copied().unwrap_or(0.0);
            percentages.insert(label, format_percent(pct));
        }

        let other = result.merged_breakdown.other();
        tax_details.insert("Other".to_string(), other);
        percentages.insert("Other".to_string(), format_percent(other_pct(result)));

        BreakdownResponse {
            request_id,
            tax_details,
            percentages,
            deviations: result
                .deviations
                .iter()
                .map(|d| (d.category.label().to_string(), d.deviation))
                .collect(),
            gap_filled: result.filled.iter().map(|c| c.label().to_string()).collect(),
            attempts: reconciled.attempts,
        }
    }
}

fn other_pct(result: &ReconciliationResult) -> f64 {
    [TaxCategory::SDI, TaxCategory::FLI]
        .iter()
        .filter_map(|c| result.merged_percentages.get(c))
        .sum()
}

pub fn format_percent(pct: f64) -> String {
    format!("{:.2}%", pct)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// POST /api/calculate-taxes - Reconciled withholding breakdown
async fn calculate_taxes(
    State(state): State<AppState>,
    body: Result<Json<CalculateTaxesRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(%request_id, "rejected body: {}", rejection);
            return missing_fields_response(&REQUIRED_FIELDS, Some(rejection.body_text()));
        }
    };

    let request = match body.validate() {
        Ok(request) => request,
        Err(PaycheckError::MissingFields(fields)) => {
            warn!(%request_id, ?fields, "missing required fields");
            return missing_fields_response(&fields, None);
        }
        Err(e) if e.is_client_error() => {
            warn!(%request_id, "invalid request: {}", e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
        Err(e) => {
            error!(%request_id, "API Error: {}", e);
            return internal_error(&e.to_string());
        }
    };

    info!(%request_id, salary = request.salary, state = %request.state, "calculating taxes");

    match state.controller.acquire_with_retry(&request).await {
        Ok(reconciled) => {
            info!(%request_id, attempts = reconciled.attempts, "calculation succeeded");
            (
                StatusCode::OK,
                Json(BreakdownResponse::from_reconciled(request_id, &reconciled)),
            )
                .into_response()
        }
        Err(report) => {
            error!(%request_id, "{}", report.summary());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": report.reason,
                    "attempts": report.attempts.len(),
                })),
            )
                .into_response()
        }
    }
}

fn missing_fields_response(fields: &[&str], detail: Option<String>) -> Response {
    let mut body = json!({
        "error": "Missing required fields",
        "requiredFields": REQUIRED_FIELDS,
        "missingFields": fields,
    });
    if let Some(detail) = detail {
        body["message"] = json!(detail);
    }
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": message })),
    )
        .into_response()
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/calculate-taxes", post(calculate_taxes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
