// Paycheck Recon - Core Library
// Cross-checks withholding figures from two tax calculators, retrying until they agree.
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod breakdown;
pub mod normalizer;
pub mod reconciliation;
pub mod session;
pub mod adapters;
pub mod request;
pub mod retry;
pub mod config;
#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{PaycheckError, Result};
pub use breakdown::{
    ComparisonCategory, LabelTarget, SourceKind, TaxBreakdown, TaxCategory,
    percent_of,
};
pub use normalizer::{
    LabelVocabulary, Normalized, RawLine, VocabularyEntry,
    normalize, normalize_detailed, parse_amount,
};
pub use reconciliation::{
    CategoryDeviation, ReconciliationEngine, ReconciliationResult,
};
pub use session::{SessionLease, SessionPool, SessionStats};
pub use adapters::{FetchPayload, FetchResponse, HttpSourceAdapter, SourceAdapter};
pub use request::{
    CalculateTaxesRequest, FilingStatus, TaxRequest,
    is_valid_zipcode, state_slug,
};
pub use retry::{
    AttemptOutcome, AttemptRecord, FailureReport, Reconciled, RetryController, SourceBinding,
};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the retry controller described by a config, wired to the HTTP worker adapters
pub fn controller_from_config(config: &AppConfig) -> Result<RetryController> {
    controller_with_sessions(config, std::sync::Arc::new(SessionPool::new()))
}

/// Same as `controller_from_config`, leasing browser sessions from an existing pool
pub fn controller_with_sessions(
    config: &AppConfig,
    sessions: std::sync::Arc<SessionPool>,
) -> Result<RetryController> {
    let binding = |source: SourceKind| -> Result<SourceBinding> {
        let source_config = config.sources.get(source);
        let adapter = HttpSourceAdapter::new(source, &source_config.endpoint, source_config.timeout())?;
        Ok(SourceBinding::new(
            std::sync::Arc::new(adapter),
            config.vocabulary.for_source(source),
        ))
    };

    Ok(RetryController::new(
        binding(SourceKind::Payroll)?,
        binding(SourceKind::Consumer)?,
        config.engine(),
    )
    .with_max_attempts(config.retry.max_attempts)
    .with_sessions(sessions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_controllers_share_session_pool() {
        let config = AppConfig::default();
        let pool = Arc::new(SessionPool::new());

        let first = controller_with_sessions(&config, pool.clone()).unwrap();
        let second = controller_with_sessions(&config, pool.clone()).unwrap();

        assert!(Arc::ptr_eq(first.sessions(), &pool));
        assert!(Arc::ptr_eq(first.sessions(), second.sessions()));
        assert_eq!(first.max_attempts(), config.retry.max_attempts);
    }

    #[test]
    fn test_controller_from_config_gets_own_pool() {
        let config = AppConfig::default();
        let first = controller_from_config(&config).unwrap();
        let second = controller_from_config(&config).unwrap();

        assert!(!Arc::ptr_eq(first.sessions(), second.sessions()));
    }
}
