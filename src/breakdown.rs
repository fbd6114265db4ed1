// 🧾 Tax Breakdown - canonical data model shared by both sources
//
// Amounts are annual dollars as f64. A category that a source did not report
// reads as 0.0, which callers treat as "not found" rather than a confirmed zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// SOURCE KIND
// ============================================================================

/// Which external calculator produced a breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Payroll-focused calculator (reports Medicare and Social Security split)
    Payroll,
    /// Consumer tax-estimate calculator (reports a single FICA figure)
    Consumer,
}

impl SourceKind {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Payroll => "Payroll calculator",
            SourceKind::Consumer => "Consumer tax estimate",
        }
    }

    /// Short code for config keys and logs
    pub fn code(&self) -> &str {
        match self {
            SourceKind::Payroll => "payroll",
            SourceKind::Consumer => "consumer",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    FederalWithholding,
    StateWithholding,
    LocalTax,
    Medicare,
    SocialSecurity,
    #[serde(rename = "sdi")]
    SDI,
    #[serde(rename = "fli")]
    FLI,
    NetPay,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 8] = [
        TaxCategory::NetPay,
        TaxCategory::FederalWithholding,
        TaxCategory::StateWithholding,
        TaxCategory::LocalTax,
        TaxCategory::Medicare,
        TaxCategory::SocialSecurity,
        TaxCategory::SDI,
        TaxCategory::FLI,
    ];

    /// Display label, matching the payroll calculator's wording
    pub fn label(&self) -> &'static str {
        match self {
            TaxCategory::FederalWithholding => "Federal Withholding",
            TaxCategory::StateWithholding => "State Tax Withholding",
            TaxCategory::LocalTax => "City Tax",
            TaxCategory::Medicare => "Medicare",
            TaxCategory::SocialSecurity => "Social Security",
            TaxCategory::SDI => "State Disability Insurance (SDI)",
            TaxCategory::FLI => "Family Leave Insurance (FLI)",
            TaxCategory::NetPay => "Net Pay",
        }
    }
}

/// What a vocabulary entry resolves to: a canonical category, or the
/// combined FICA figure only the consumer source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelTarget {
    FederalWithholding,
    StateWithholding,
    LocalTax,
    Medicare,
    SocialSecurity,
    #[serde(rename = "sdi")]
    SDI,
    #[serde(rename = "fli")]
    FLI,
    NetPay,
    Fica,
}

impl LabelTarget {
    pub fn category(&self) -> Option<TaxCategory> {
        match self {
            LabelTarget::FederalWithholding => Some(TaxCategory::FederalWithholding),
            LabelTarget::StateWithholding => Some(TaxCategory::StateWithholding),
            LabelTarget::LocalTax => Some(TaxCategory::LocalTax),
            LabelTarget::Medicare => Some(TaxCategory::Medicare),
            LabelTarget::SocialSecurity => Some(TaxCategory::SocialSecurity),
            LabelTarget::SDI => Some(TaxCategory::SDI),
            LabelTarget::FLI => Some(TaxCategory::FLI),
            LabelTarget::NetPay => Some(TaxCategory::NetPay),
            LabelTarget::Fica => None,
        }
    }
}

impl From<TaxCategory> for LabelTarget {
    fn from(category: TaxCategory) -> Self {
        match category {
            TaxCategory::FederalWithholding => LabelTarget::FederalWithholding,
            TaxCategory::StateWithholding => LabelTarget::StateWithholding,
            TaxCategory::LocalTax => LabelTarget::LocalTax,
            TaxCategory::Medicare => LabelTarget::Medicare,
            TaxCategory::SocialSecurity => LabelTarget::SocialSecurity,
            TaxCategory::SDI => LabelTarget::SDI,
            TaxCategory::FLI => LabelTarget::FLI,
            TaxCategory::NetPay => LabelTarget::NetPay,
        }
    }
}

/// Categories both sources can report, with Medicare + Social Security
/// folded into FICA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonCategory {
    FederalWithholding,
    StateWithholding,
    LocalTax,
    Fica,
    NetPay,
}

impl ComparisonCategory {
    /// Comparison set, optionally leaving out NetPay
    pub fn comparison_set(include_net_pay: bool) -> Vec<ComparisonCategory> {
        let mut set = vec![
            ComparisonCategory::FederalWithholding,
            ComparisonCategory::StateWithholding,
            ComparisonCategory::LocalTax,
            ComparisonCategory::Fica,
        ];
        if include_net_pay {
            set.push(ComparisonCategory::NetPay);
        }
        set
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComparisonCategory::FederalWithholding => TaxCategory::FederalWithholding.label(),
            ComparisonCategory::StateWithholding => TaxCategory::StateWithholding.label(),
            ComparisonCategory::LocalTax => TaxCategory::LocalTax.label(),
            ComparisonCategory::Fica => "FICA",
            ComparisonCategory::NetPay => TaxCategory::NetPay.label(),
        }
    }

    /// Amount of this category in a breakdown, summing the split side for FICA
    pub fn amount_in(&self, breakdown: &TaxBreakdown) -> f64 {
        match self {
            ComparisonCategory::FederalWithholding => {
                breakdown.amount(TaxCategory::FederalWithholding)
            }
            ComparisonCategory::StateWithholding => breakdown.amount(TaxCategory::StateWithholding),
            ComparisonCategory::LocalTax => breakdown.amount(TaxCategory::LocalTax),
            ComparisonCategory::Fica => breakdown.fica(),
            ComparisonCategory::NetPay => breakdown.amount(TaxCategory::NetPay),
        }
    }
}

// ============================================================================
// TAX BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    amounts: BTreeMap<TaxCategory, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    combined_fica: Option<f64>,
}

impl TaxBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set one category
    pub fn with(mut self, category: TaxCategory, amount: f64) -> Self {
        self.set(category, amount);
        self
    }

    /// Builder pattern: set the combined FICA figure
    pub fn with_fica(mut self, amount: f64) -> Self {
        self.set_combined_fica(amount);
        self
    }

    /// Store an amount; negatives keep their magnitude, non-finite values become 0
    pub fn set(&mut self, category: TaxCategory, amount: f64) {
        self.amounts.insert(category, sanitize(amount));
    }

    pub fn set_combined_fica(&mut self, amount: f64) {
        self.combined_fica = Some(sanitize(amount));
    }

    /// Amount for a category; unreported categories read as 0.0
    pub fn amount(&self, category: TaxCategory) -> f64 {
        self.amounts.get(&category).copied().unwrap_or(0.0)
    }

    pub fn combined_fica(&self) -> Option<f64> {
        self.combined_fica
    }

    /// FICA: the combined figure when reported non-zero, else Medicare + Social Security
    pub fn fica(&self) -> f64 {
        match self.combined_fica {
            Some(value) if value > 0.0 => value,
            _ => self.amount(TaxCategory::Medicare) + self.amount(TaxCategory::SocialSecurity),
        }
    }

    /// SDI + FLI, reported as "Other"
    pub fn other(&self) -> f64 {
        self.amount(TaxCategory::SDI) + self.amount(TaxCategory::FLI)
    }

    /// True when the category reads as zero (not found)
    pub fn is_missing(&self, category: TaxCategory) -> bool {
        self.amount(category) == 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaxCategory, f64)> + '_ {
        self.amounts.iter().map(|(category, amount)| (*category, *amount))
    }
}

/// Amount as a percentage of salary
pub fn percent_of(amount: f64, salary: f64) -> f64 {
    if salary > 0.0 {
        amount / salary * 100.0
    } else {
        0.0
    }
}

fn sanitize(amount: f64) -> f64 {
    if amount.is_finite() {
        amount.abs()
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
