// 🔁 Retry Controller - bounded, strictly sequential acquisition attempts
//
// Attempting(n) -> Success                     (sources agree)
//               -> Attempting(n + 1)           (mismatch or source failure, attempts remain)
//               -> ExhaustedFailure            (attempt budget spent)
//
// Giving up is a value (`Err(FailureReport)`), never a propagated error.

use crate::adapters::SourceAdapter;
use crate::breakdown::{SourceKind, TaxBreakdown};
use crate::error::{PaycheckError, Result};
use crate::normalizer::{normalize_detailed, LabelVocabulary};
use crate::reconciliation::{ReconciliationEngine, ReconciliationResult};
use crate::request::TaxRequest;
use crate::session::SessionPool;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success(ReconciliationResult),
    SourceFailure { source: SourceKind, reason: String },
    Mismatch(ReconciliationResult),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// Sources agreed on some attempt
#[derive(Debug, Clone, Serialize)]
pub struct Reconciled {
    pub result: ReconciliationResult,
    /// Number of attempts made, including the successful one
    pub attempts: u32,
    pub history: Vec<AttemptRecord>,
}

impl Reconciled {
    pub fn breakdown(&self) -> &TaxBreakdown {
        &self.result.merged_breakdown
    }
}

/// Every attempt failed or disagreed
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub reason: String,
    pub attempts: Vec<AttemptRecord>,
}

impl FailureReport {
    pub fn source_failures(&self) -> usize {
        self.attempts
            .iter()
            .filter(|r| matches!(r.outcome, AttemptOutcome::SourceFailure { .. }))
            .count()
    }

    pub fn mismatches(&self) -> usize {
        self.attempts
            .iter()
            .filter(|r| matches!(r.outcome, AttemptOutcome::Mismatch(_)))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} after {} attempts ({} source failures, {} mismatches)",
            self.reason,
            self.attempts.len(),
            self.source_failures(),
            self.mismatches()
        )
    }
}

// ============================================================================
// RETRY CONTROLLER
// ============================================================================

/// An adapter together with the vocabulary its labels are normalized with
#[derive(Clone)]
pub struct SourceBinding {
    pub adapter: Arc<dyn SourceAdapter>,
    pub vocabulary: LabelVocabulary,
}

impl SourceBinding {
    pub fn new(adapter: Arc<dyn SourceAdapter>, vocabulary: LabelVocabulary) -> Self {
        SourceBinding { adapter, vocabulary }
    }

    /// Binding with the built-in vocabulary for the adapter's source
    pub fn with_default_vocabulary(adapter: Arc<dyn SourceAdapter>) -> Self {
        let vocabulary = LabelVocabulary::default_for(adapter.source());
        SourceBinding { adapter, vocabulary }
    }
}

pub struct RetryController {
    primary: SourceBinding,
    secondary: SourceBinding,
    engine: ReconciliationEngine,
    max_attempts: u32,
    sessions: Arc<SessionPool>,
}

impl RetryController {
    /// `primary` is source A (kept and gap-filled), `secondary` is source B
    pub fn new(primary: SourceBinding, secondary: SourceBinding, engine: ReconciliationEngine) -> Self {
        RetryController {
            primary,
            secondary,
            engine,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sessions: Arc::new(SessionPool::new()),
        }
    }

    /// Builder pattern: attempt budget (at least one attempt is always made)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Builder pattern: share a session pool with other controllers
    pub fn with_sessions(mut self, sessions: Arc<SessionPool>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &Arc<SessionPool> {
        &self.sessions
    }

    /// Run attempts until the sources agree or the budget is spent
    pub async fn acquire_with_retry(&self, request: &TaxRequest) -> std::result::Result<Reconciled, FailureReport> {
        let mut history = Vec::new();

        for attempt in 1..=self.max_attempts {
            info!(attempt, max = self.max_attempts, "starting acquisition attempt");

            let outcome = match self.run_attempt(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Not recoverable by another attempt (e.g. unusable salary)
                    warn!("aborting retries: {}", e);
                    return Err(FailureReport {
                        reason: e.to_string(),
                        attempts: history,
                    });
                }
            };

            if let AttemptOutcome::Success(result) = outcome {
                info!(attempt, "{}", result.summary());
                history.push(AttemptRecord {
                    attempt,
                    outcome: AttemptOutcome::Success(result.clone()),
                });
                return Ok(Reconciled {
                    result,
                    attempts: attempt,
                    history,
                });
            }

            match &outcome {
                AttemptOutcome::Mismatch(result) => {
                    warn!(attempt, mismatched = ?result.mismatches(), "{}", result.summary());
                }
                AttemptOutcome::SourceFailure { source, reason } => {
                    warn!(attempt, %source, "source failed: {}", reason);
                }
                AttemptOutcome::Success(_) => {}
            }
            history.push(AttemptRecord { attempt, outcome });
        }

        warn!(attempts = self.max_attempts, "sources never agreed, giving up");
        Err(FailureReport {
            reason: "Failed to calculate taxes after multiple attempts".to_string(),
            attempts: history,
        })
    }

    /// One full pipeline: A, then B, then normalize and reconcile
    async fn run_attempt(&self, request: &TaxRequest) -> Result<AttemptOutcome> {
        let a = match self.acquire(&self.primary, request).await {
            Ok(breakdown) => breakdown,
            Err(failure) => return Ok(failure),
        };
        let b = match self.acquire(&self.secondary, request).await {
            Ok(breakdown) => breakdown,
            Err(failure) => return Ok(failure),
        };

        let result = self.engine.reconcile(&a, &b, request.salary)?;
        Ok(if result.within_threshold {
            AttemptOutcome::Success(result)
        } else {
            AttemptOutcome::Mismatch(result)
        })
    }

    /// Fetch and normalize one source; the session lease ends with this call
    async fn acquire(&self, binding: &SourceBinding, request: &TaxRequest) -> std::result::Result<TaxBreakdown, AttemptOutcome> {
        let source = binding.adapter.source();
        let raw = {
            let mut lease = self.sessions.acquire().await;
            binding.adapter.fetch(&mut lease, request).await
        };

        match raw {
            Ok(lines) => {
                let normalized = normalize_detailed(&lines, &binding.vocabulary);
                if !normalized.missing.is_empty() {
                    debug!(%source, missing = ?normalized.missing, "labels not found, treated as 0");
                }
                Ok(normalized.breakdown)
            }
            Err(e) => {
                let (source, reason) = match e {
                    PaycheckError::Acquisition { origin, reason } => (origin, reason),
                    other => (source, other.to_string()),
                };
                Err(AttemptOutcome::SourceFailure { source, reason })
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
