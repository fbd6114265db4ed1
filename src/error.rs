// 🚨 Error taxonomy
// Every failure is scoped to a single request; none of these are fatal to the process.

use crate::breakdown::SourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaycheckError {
    /// Source unreachable, page element missing, timeout
    #[error("Acquisition failed for {origin}: {reason}")]
    Acquisition { origin: SourceKind, reason: String },

    /// Malformed numeric text on a result page
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request fields present but unusable
    #[error("Validation error: {0}")]
    Validation(String),

    /// Required request fields absent or blank
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PaycheckError {
    pub fn acquisition(origin: SourceKind, reason: impl Into<String>) -> Self {
        PaycheckError::Acquisition {
            origin,
            reason: reason.into(),
        }
    }

    /// Client-side errors map to HTTP 400 at the request surface
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaycheckError::Validation(_) | PaycheckError::MissingFields(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PaycheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_all() {
        let err = PaycheckError::MissingFields(vec!["salary", "zipcode"]);
        assert_eq!(err.to_string(), "Missing required fields: salary, zipcode");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_acquisition_is_not_client_error() {
        let err = PaycheckError::acquisition(SourceKind::Payroll, "navigation timeout");
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("navigation timeout"));
    }
}
