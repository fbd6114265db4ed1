// 🏷️ Tax Breakdown Normalizer
// Maps each site's raw result labels onto the canonical categories.
//
// The vocabulary is data: an ordered list of accepted label variants per
// target. Markup drift on a site is a config change, not a code change.

use crate::breakdown::{LabelTarget, SourceKind, TaxBreakdown};
use crate::error::{PaycheckError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// RAW INPUT
// ============================================================================

/// One label/value pair as scraped from a result page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub label: String,
    /// Value text as displayed, e.g. "$9,000.00" or "($12.50)"
    pub text: String,
}

impl RawLine {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        RawLine {
            label: label.into(),
            text: text.into(),
        }
    }
}

// ============================================================================
// VOCABULARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub target: LabelTarget,
    /// Accepted label variants, tried in order
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    entries: Vec<VocabularyEntry>,
}

impl LabelVocabulary {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        LabelVocabulary { entries }
    }

    /// Builder pattern: add a target with its label variants
    pub fn with(mut self, target: LabelTarget, labels: &[&str]) -> Self {
        self.entries.push(VocabularyEntry {
            target,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        self
    }

    /// Labels shown by the payroll calculator's result panel
    pub fn payroll_default() -> Self {
        LabelVocabulary::default()
            .with(LabelTarget::NetPay, &["Take home pay (net pay)"])
            .with(LabelTarget::FederalWithholding, &["Federal Withholding"])
            .with(LabelTarget::StateWithholding, &["State Tax Withholding"])
            .with(LabelTarget::LocalTax, &["City Tax"])
            .with(LabelTarget::Medicare, &["Medicare"])
            .with(LabelTarget::SocialSecurity, &["Social Security"])
            .with(LabelTarget::SDI, &["State Disability Insurance (SDI)"])
            .with(LabelTarget::FLI, &["Family Leave Insurance (FLI)"])
    }

    /// Labels emitted for the consumer estimate's result spans
    pub fn consumer_default() -> Self {
        LabelVocabulary::default()
            .with(LabelTarget::FederalWithholding, &["Federal Withholding"])
            .with(LabelTarget::StateWithholding, &["State Tax Withholding"])
            .with(LabelTarget::LocalTax, &["City Tax"])
            .with(LabelTarget::Fica, &["FICA"])
            .with(LabelTarget::NetPay, &["Net Pay"])
    }

    pub fn default_for(source: SourceKind) -> Self {
        match source {
            SourceKind::Payroll => Self::payroll_default(),
            SourceKind::Consumer => Self::consumer_default(),
        }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalized breakdown plus the targets no label matched
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub breakdown: TaxBreakdown,
    pub missing: Vec<LabelTarget>,
}

pub fn normalize(raw: &[RawLine], vocabulary: &LabelVocabulary) -> TaxBreakdown {
    normalize_detailed(raw, vocabulary).breakdown
}

pub fn normalize_detailed(raw: &[RawLine], vocabulary: &LabelVocabulary) -> Normalized {
    let mut breakdown = TaxBreakdown::new();
    let mut missing = Vec::new();

    for entry in vocabulary.entries() {
        let found = entry.labels.iter().find_map(|variant| {
            raw.iter().find(|line| line.label.trim() == variant.as_str())
        });

        let amount = match found {
            Some(line) => match parse_amount(&line.text) {
                Ok(value) => value,
                Err(e) => {
                    warn!(label = %line.label, text = %line.text, "treating unparseable amount as 0: {}", e);
                    0.0
                }
            },
            None => {
                debug!(target_label = ?entry.target, "no label variant matched");
                missing.push(entry.target);
                0.0
            }
        };

        match entry.target.category() {
            Some(category) => breakdown.set(category, amount),
            None => breakdown.set_combined_fica(amount),
        }
    }

    Normalized { breakdown, missing }
}

/// Parse displayed currency text: "$1,234.50" → 1234.5, "($12.00)" → -12.0
pub fn parse_amount(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(PaycheckError::Parse(format!("no numeric content in {:?}", text)));
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| PaycheckError::Parse(format!("not a number: {:?}", text)))?;

    if !value.is_finite() {
        return Err(PaycheckError::Parse(format!("not a finite amount: {:?}", text)));
    }

    Ok(if negative { -value } else { value })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakdown::TaxCategory;

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$9,000.00").unwrap(), 9000.0);
        assert_eq!(parse_amount("  $942.50 ").unwrap(), 942.5);
        assert_eq!(parse_amount("($1,200.25)").unwrap(), -1200.25);
        assert_eq!(parse_amount("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount("N/A"), Err(PaycheckError::Parse(_))));
        assert!(matches!(parse_amount("$"), Err(PaycheckError::Parse(_))));
        assert!(matches!(parse_amount(""), Err(PaycheckError::Parse(_))));
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn test_normalize_payroll_page() {
        let raw = vec![
            RawLine::new("Take home pay (net pay)", "$47,527.50"),
            RawLine::new("Federal Withholding", "$9,000.00"),
            RawLine::new(" State Tax Withholding ", "$3,500.00"),
            RawLine::new("Medicare", "$942.50"),
            RawLine::new("Social Security", "$4,030.00"),
        ];

        let normalized = normalize_detailed(&raw, &LabelVocabulary::payroll_default());
        let breakdown = &normalized.breakdown;

        assert_eq!(breakdown.amount(TaxCategory::NetPay), 47527.5);
        assert_eq!(breakdown.amount(TaxCategory::StateWithholding), 3500.0);
        assert_eq!(breakdown.amount(TaxCategory::LocalTax), 0.0);
        assert!(normalized.missing.contains(&LabelTarget::LocalTax));
        assert!(normalized.missing.contains(&LabelTarget::SDI));
        assert!(!normalized.missing.contains(&LabelTarget::Medicare));
    }

    #[test]
    fn test_normalize_consumer_fica() {
        let raw = vec![
            RawLine::new("Federal Withholding", "$9,000"),
            RawLine::new("FICA", "$4,972.50"),
        ];
        let breakdown = normalize(&raw, &LabelVocabulary::consumer_default());
        assert_eq!(breakdown.combined_fica(), Some(4972.5));
        assert_eq!(breakdown.fica(), 4972.5);
        assert_eq!(breakdown.amount(TaxCategory::Medicare), 0.0);
    }

    #[test]
    fn test_first_variant_wins() {
        let vocabulary = LabelVocabulary::default()
            .with(LabelTarget::LocalTax, &["Local Tax", "City Tax"]);
        let raw = vec![
            RawLine::new("City Tax", "$10"),
            RawLine::new("Local Tax", "$20"),
        ];
        let breakdown = normalize(&raw, &vocabulary);
        assert_eq!(breakdown.amount(TaxCategory::LocalTax), 20.0);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let raw = vec![RawLine::new("medicare", "$942.50")];
        let breakdown = normalize(&raw, &LabelVocabulary::payroll_default());
        assert_eq!(breakdown.amount(TaxCategory::Medicare), 0.0);
    }

    #[test]
    fn test_unparseable_amount_becomes_zero() {
        let raw = vec![RawLine::new("Federal Withholding", "--")];
        let normalized = normalize_detailed(&raw, &LabelVocabulary::payroll_default());
        assert_eq!(normalized.breakdown.amount(TaxCategory::FederalWithholding), 0.0);
        // Found but unparseable is not reported as missing
        assert!(!normalized.missing.contains(&LabelTarget::FederalWithholding));
    }

    #[test]
    fn test_parenthesized_amount_stored_as_magnitude() {
        let raw = vec![RawLine::new("City Tax", "($45.00)")];
        let breakdown = normalize(&raw, &LabelVocabulary::payroll_default());
        assert_eq!(breakdown.amount(TaxCategory::LocalTax), 45.0);
    }

    #[test]
    fn test_parenthesized_fica_stored_as_magnitude() {
        let raw = vec![RawLine::new("FICA", "($4,972.50)")];
        let breakdown = normalize(&raw, &LabelVocabulary::consumer_default());
        assert_eq!(breakdown.combined_fica(), Some(4972.50));
    }
}
