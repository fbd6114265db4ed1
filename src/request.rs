// 📨 Request Surface - validated calculation parameters
//
// The JSON body mirrors the public endpoint (camelCase). `validate()` turns it
// into a `TaxRequest`, the only input the adapters ever see.

use crate::breakdown::SourceKind;
use crate::error::{PaycheckError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const REQUIRED_FIELDS: [&str; 6] = ["salary", "state", "address", "city", "zipcode", "filingStatus"];

// ============================================================================
// FILING STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingStatus {
    Single,
    MarriedJointly,
    MarriedSeparately,
    HeadOfHousehold,
    NonresidentAlien,
}

impl FilingStatus {
    /// Federal filing status option on the payroll calculator
    pub fn payroll_code(&self) -> &'static str {
        match self {
            // The payroll site groups "Single or Married Filing Separately"
            FilingStatus::Single | FilingStatus::MarriedSeparately => "SINGLE",
            FilingStatus::MarriedJointly => "MARRIED",
            FilingStatus::HeadOfHousehold => "HEAD_OF_HOUSEHOLD",
            FilingStatus::NonresidentAlien => "NONRESIDENT_ALIEN",
        }
    }

    /// State filing status option ('S' or 'M')
    pub fn state_code(&self) -> &'static str {
        match self {
            FilingStatus::MarriedJointly => "M",
            _ => "S",
        }
    }

    /// Dropdown text on the consumer estimate
    pub fn consumer_label(&self) -> &'static str {
        match self {
            FilingStatus::Single | FilingStatus::NonresidentAlien => "Single",
            FilingStatus::MarriedJointly => "Married",
            FilingStatus::MarriedSeparately => "Married Separately",
            FilingStatus::HeadOfHousehold => "Head of Household",
        }
    }
}

impl FromStr for FilingStatus {
    type Err = PaycheckError;

    /// Accepts either site's wording, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");

        match key.as_str() {
            "single" | "s" => Ok(FilingStatus::Single),
            "married" | "married filing jointly" | "married jointly" | "m" => {
                Ok(FilingStatus::MarriedJointly)
            }
            "married separately" | "married filing separately" => Ok(FilingStatus::MarriedSeparately),
            "head of household" => Ok(FilingStatus::HeadOfHousehold),
            "nonresident alien" => Ok(FilingStatus::NonresidentAlien),
            _ => Err(PaycheckError::Validation(format!("unknown filing status: {:?}", s))),
        }
    }
}

// ============================================================================
// INBOUND BODY
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateTaxesRequest {
    pub salary: Option<f64>,
    pub withholding: Option<f64>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub filing_status: Option<String>,
}

impl CalculateTaxesRequest {
    /// Check required fields and build the adapter input
    pub fn validate(&self) -> Result<TaxRequest> {
        let mut missing = Vec::new();

        let salary = self.salary.filter(|s| s.is_finite() && *s > 0.0);
        if salary.is_none() {
            missing.push("salary");
        }
        let state = present(&self.state, "state", &mut missing);
        let address = present(&self.address, "address", &mut missing);
        let city = present(&self.city, "city", &mut missing);
        let zipcode = present(&self.zipcode, "zipcode", &mut missing);
        let filing_status = present(&self.filing_status, "filingStatus", &mut missing);

        if !missing.is_empty() {
            return Err(PaycheckError::MissingFields(missing));
        }

        let withholding = self.withholding.unwrap_or(0.0);
        if !withholding.is_finite() || withholding < 0.0 {
            return Err(PaycheckError::Validation(format!(
                "withholding must be a non-negative amount, got {}",
                withholding
            )));
        }

        // All present at this point
        Ok(TaxRequest {
            salary: salary.unwrap_or_default(),
            withholding,
            state: state.unwrap_or_default(),
            address: address.unwrap_or_default(),
            city: city.unwrap_or_default(),
            zipcode: zipcode.unwrap_or_default(),
            filing_status: filing_status.unwrap_or_default().parse()?,
        })
    }
}

fn present(value: &Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            missing.push(field);
            None
        }
    }
}

// ============================================================================
// VALIDATED REQUEST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRequest {
    pub salary: f64,
    pub withholding: f64,
    pub state: String,
    pub address: String,
    pub city: String,
    pub zipcode: String,
    pub filing_status: FilingStatus,
}

impl TaxRequest {
    /// Salary as entered on a given source. The consumer estimate has no
    /// withholding field, so the additional withholding comes off the salary.
    pub fn salary_for(&self, source: SourceKind) -> f64 {
        match source {
            SourceKind::Payroll => self.salary,
            SourceKind::Consumer => (self.salary - self.withholding).max(0.0),
        }
    }

    pub fn state_slug(&self) -> String {
        state_slug(&self.state)
    }
}

/// "New York" → "new-york"
pub fn state_slug(state: &str) -> String {
    state
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// 5-digit ZIP or ZIP+4
pub fn is_valid_zipcode(zipcode: &str) -> bool {
    let zip = zipcode.trim();
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match zip.split_once('-') {
        None => zip.len() == 5 && digits(zip),
        Some((base, ext)) => base.len() == 5 && ext.len() == 4 && digits(base) && digits(ext),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> CalculateTaxesRequest {
        CalculateTaxesRequest {
            salary: Some(65000.0),
            withholding: None,
            state: Some("New York".to_string()),
            address: Some("35 Hudson Yards".to_string()),
            city: Some("New York".to_string()),
            zipcode: Some("10001".to_string()),
            filing_status: Some("SINGLE".to_string()),
        }
    }

    #[test]
    fn test_validate_defaults_withholding() {
        let request = full_request().validate().unwrap();
        assert_eq!(request.withholding, 0.0);
        assert_eq!(request.filing_status, FilingStatus::Single);
        assert_eq!(request.state_slug(), "new-york");
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let body = CalculateTaxesRequest {
            salary: Some(0.0),
            city: Some("   ".to_string()),
            ..full_request()
        };
        match body.validate() {
            Err(PaycheckError::MissingFields(fields)) => assert_eq!(fields, vec!["salary", "city"]),
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_empty_body() {
        match CalculateTaxesRequest::default().validate() {
            Err(PaycheckError::MissingFields(fields)) => assert_eq!(fields, REQUIRED_FIELDS.to_vec()),
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_filing_status() {
        let body = CalculateTaxesRequest {
            filing_status: Some("Widowed".to_string()),
            ..full_request()
        };
        assert!(matches!(body.validate(), Err(PaycheckError::Validation(_))));
    }

    #[test]
    fn test_body_deserializes_camel_case() {
        let body: CalculateTaxesRequest = serde_json::from_str(
            r#"{"salary": 80000, "withholding": 1000, "state": "California", "address": "1 Main St",
                "city": "San Jose", "zipcode": "95113", "filingStatus": "Married Filing Jointly"}"#,
        )
        .unwrap();
        let request = body.validate().unwrap();
        assert_eq!(request.filing_status, FilingStatus::MarriedJointly);
        assert_eq!(request.salary_for(SourceKind::Consumer), 79000.0);
        assert_eq!(request.salary_for(SourceKind::Payroll), 80000.0);
    }

    #[test]
    fn test_filing_status_codes() {
        let head: FilingStatus = "HEAD_OF_HOUSEHOLD".parse().unwrap();
        assert_eq!(head, FilingStatus::HeadOfHousehold);
        assert_eq!(head.payroll_code(), "HEAD_OF_HOUSEHOLD");
        assert_eq!(head.state_code(), "S");
        assert_eq!(head.consumer_label(), "Head of Household");

        let married: FilingStatus = "married".parse().unwrap();
        assert_eq!(married.state_code(), "M");
        assert_eq!(married.consumer_label(), "Married");

        let separately: FilingStatus = "Married Filing Separately".parse().unwrap();
        assert_eq!(separately.payroll_code(), "SINGLE");
        assert_eq!(separately.consumer_label(), "Married Separately");
    }

    #[test]
    fn test_zipcode_format() {
        assert!(is_valid_zipcode("10001"));
        assert!(is_valid_zipcode("10001-1234"));
        assert!(!is_valid_zipcode("1000"));
        assert!(!is_valid_zipcode("10001-12"));
        assert!(!is_valid_zipcode("ABCDE"));
    }

    #[test]
    fn test_state_slug_collapses_whitespace() {
        assert_eq!(state_slug("  North   Carolina "), "north-carolina");
        assert_eq!(state_slug("Texas"), "texas");
    }
}
