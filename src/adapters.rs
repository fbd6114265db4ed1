// 🔌 Source Adapters - the collaborator contract for each calculator
//
// An adapter drives one external calculator and hands back the raw
// label/value lines from its result page. Page scripting itself lives in a
// headless-browser worker; `HttpSourceAdapter` is the client for that worker.

use crate::breakdown::SourceKind;
use crate::error::{PaycheckError, Result};
use crate::normalizer::RawLine;
use crate::request::TaxRequest;
use crate::session::SessionLease;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// SourceAdapter - one external calculator
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which calculator this adapter drives
    fn source(&self) -> SourceKind;

    /// Run the calculator for a request
    ///
    /// # Returns
    /// * `Ok(Vec<RawLine>)` - label/value lines from the result page
    /// * `Err(PaycheckError::Acquisition)` - navigation, element or network failure
    async fn fetch(&self, session: &mut SessionLease<'_>, request: &TaxRequest) -> Result<Vec<RawLine>>;
}

// ============================================================================
// WORKER PROTOCOL
// ============================================================================

/// Body posted to the browser worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchPayload {
    pub source: SourceKind,
    pub salary: f64,
    pub withholding: f64,
    pub filing_status: String,
    pub state_filing_status: String,
    pub zipcode: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub state_slug: String,
}

impl FetchPayload {
    pub fn for_source(source: SourceKind, request: &TaxRequest) -> Self {
        let filing_status = match source {
            SourceKind::Payroll => request.filing_status.payroll_code(),
            SourceKind::Consumer => request.filing_status.consumer_label(),
        };
        FetchPayload {
            source,
            salary: request.salary_for(source),
            withholding: request.withholding,
            filing_status: filing_status.to_string(),
            state_filing_status: request.filing_status.state_code().to_string(),
            zipcode: request.zipcode.clone(),
            address: request.address.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            state_slug: request.state_slug(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub lines: Vec<RawLine>,
}

// ============================================================================
// HTTP ADAPTER
// ============================================================================

pub struct HttpSourceAdapter {
    source: SourceKind,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSourceAdapter {
    pub fn new(source: SourceKind, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaycheckError::Config(format!("HTTP client for {}: {}", source, e)))?;
        Ok(HttpSourceAdapter {
            source,
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SourceAdapter for HttpSourceAdapter {
    fn source(&self) -> SourceKind {
        self.source
    }

    async fn fetch(&self, session: &mut SessionLease<'_>, request: &TaxRequest) -> Result<Vec<RawLine>> {
        let payload = FetchPayload::for_source(self.source, request);
        info!(source = %self.source, session = %session.id(), "requesting calculation from worker");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Session-Id", session.id().to_string())
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaycheckError::acquisition(self.source, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaycheckError::acquisition(
                self.source,
                format!("worker returned {}: {}", status, body.trim()),
            ));
        }

        let parsed: FetchResponse = response
            .json()
            .await
            .map_err(|e| PaycheckError::acquisition(self.source, format!("invalid worker response: {}", e)))?;

        debug!(source = %self.source, lines = parsed.lines.len(), "worker returned result lines");
        Ok(parsed.lines)
    }
}

// ============================================================================
// TESTS
// ============================================================================
