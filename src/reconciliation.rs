// ⚖️ Reconciliation Engine - Do the two sources agree?
//
// For every comparison category:
//   deviation = |amount_a / salary * 100 - amount_b / salary * 100|
//
// The sources agree when every deviation is within the tolerance (percentage
// points of salary). Source A's unreported categories are then gap-filled
// from source B for the breakdown handed back to the caller.

use crate::breakdown::{percent_of, ComparisonCategory, TaxBreakdown, TaxCategory};
use crate::error::{PaycheckError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statutory employee FICA rate (percent of wages)
pub const FICA_RATE: f64 = 7.65;
pub const MEDICARE_RATE: f64 = 1.45;
pub const SOCIAL_SECURITY_RATE: f64 = 6.2;

pub const DEFAULT_TOLERANCE_PCT: f64 = 1.5;

/// Slack on the tolerance comparison so a deviation equal to the tolerance
/// still passes after float rounding
pub const DEVIATION_EPSILON: f64 = 1e-9;

fn within_tolerance(deviation: f64, tolerance_pct: f64) -> bool {
    deviation <= tolerance_pct + DEVIATION_EPSILON
}

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDeviation {
    pub category: ComparisonCategory,
    pub amount_a: f64,
    pub amount_b: f64,
    pub pct_a: f64,
    pub pct_b: f64,
    /// Absolute difference in percentage points
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub within_threshold: bool,
    pub deviations: Vec<CategoryDeviation>,
    pub merged_breakdown: TaxBreakdown,
    /// Percent of salary per category, computed after gap-filling
    pub merged_percentages: BTreeMap<TaxCategory, f64>,
    /// Categories in the merged breakdown taken from source B
    pub filled: Vec<TaxCategory>,
    pub salary: f64,
    pub tolerance_pct: f64,
    pub reconciled_at: chrono::DateTime<chrono::Utc>,
}

impl ReconciliationResult {
    pub fn deviation_for(&self, category: ComparisonCategory) -> Option<f64> {
        self.deviations
            .iter()
            .find(|d| d.category == category)
            .map(|d| d.deviation)
    }

    pub fn per_category_deviation_pct(&self) -> BTreeMap<ComparisonCategory, f64> {
        self.deviations
            .iter()
            .map(|d| (d.category, d.deviation))
            .collect()
    }

    pub fn max_deviation(&self) -> f64 {
        self.deviations
            .iter()
            .map(|d| d.deviation)
            .fold(0.0, f64::max)
    }

    /// Categories whose deviation exceeded the tolerance
    pub fn mismatches(&self) -> Vec<ComparisonCategory> {
        self.deviations
            .iter()
            .filter(|d| !within_tolerance(d.deviation, self.tolerance_pct))
            .map(|d| d.category)
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation on salary ${:.2}: {} (max deviation {:.2} pts, tolerance {:.2} pts, {} gap-filled)",
            self.salary,
            if self.within_threshold { "agree" } else { "disagree" },
            self.max_deviation(),
            self.tolerance_pct,
            self.filled.len()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationEngine {
    /// Maximum allowed deviation in percentage points (default: 1.5)
    pub tolerance_pct: f64,

    /// Leave NetPay out of both the comparison and gap-filling
    pub exclude_net_pay: bool,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            exclude_net_pay: true,
        }
    }

    pub fn with_tolerance(tolerance_pct: f64) -> Self {
        ReconciliationEngine {
            tolerance_pct,
            ..Self::new()
        }
    }

    pub fn with_options(tolerance_pct: f64, exclude_net_pay: bool) -> Self {
        ReconciliationEngine {
            tolerance_pct,
            exclude_net_pay,
        }
    }

    /// Compare source A against source B for a given salary
    ///
    /// Example:
    /// ```
    /// use paycheck_recon::{ReconciliationEngine, TaxBreakdown, TaxCategory};
    ///
    /// let engine = ReconciliationEngine::with_tolerance(1.0);
    /// let a = TaxBreakdown::new()
    ///     .with(TaxCategory::FederalWithholding, 9000.0)
    ///     .with(TaxCategory::Medicare, 942.50)
    ///     .with(TaxCategory::SocialSecurity, 4030.0);
    /// let b = TaxBreakdown::new()
    ///     .with(TaxCategory::FederalWithholding, 9000.0)
    ///     .with_fica(4972.50);
    ///
    /// let result = engine.reconcile(&a, &b, 65000.0).unwrap();
    /// assert!(result.within_threshold);
    /// ```
    pub fn reconcile(
        &self,
        a: &TaxBreakdown,
        b: &TaxBreakdown,
        salary: f64,
    ) -> Result<ReconciliationResult> {
        if !salary.is_finite() || salary <= 0.0 {
            return Err(PaycheckError::Validation(format!(
                "salary must be a positive amount, got {}",
                salary
            )));
        }

        let deviations = self.compare(a, b, salary);
        let within_threshold = deviations
            .iter()
            .all(|d| within_tolerance(d.deviation, self.tolerance_pct));

        let (merged_breakdown, filled) = self.gap_fill(a, b);
        let merged_percentages = TaxCategory::ALL
            .iter()
            .map(|category| (*category, percent_of(merged_breakdown.amount(*category), salary)))
            .collect();

        Ok(ReconciliationResult {
            within_threshold,
            deviations,
            merged_breakdown,
            merged_percentages,
            filled,
            salary,
            tolerance_pct: self.tolerance_pct,
            reconciled_at: chrono::Utc::now(),
        })
    }

    /// Per-category deviations on the pre-fill values
    fn compare(&self, a: &TaxBreakdown, b: &TaxBreakdown, salary: f64) -> Vec<CategoryDeviation> {
        ComparisonCategory::comparison_set(!self.exclude_net_pay)
            .into_iter()
            .map(|category| {
                let amount_a = category.amount_in(a);
                let amount_b = category.amount_in(b);
                let pct_a = percent_of(amount_a, salary);
                let pct_b = percent_of(amount_b, salary);
                CategoryDeviation {
                    category,
                    amount_a,
                    amount_b,
                    pct_a,
                    pct_b,
                    deviation: (pct_a - pct_b).abs(),
                }
            })
            .collect()
    }

    /// Copy of A with its zero categories replaced by B's non-zero values
    fn gap_fill(&self, a: &TaxBreakdown, b: &TaxBreakdown) -> (TaxBreakdown, Vec<TaxCategory>) {
        let mut merged = a.clone();
        let mut filled = Vec::new();

        let mut fillable = vec![
            TaxCategory::FederalWithholding,
            TaxCategory::StateWithholding,
            TaxCategory::LocalTax,
            TaxCategory::Medicare,
            TaxCategory::SocialSecurity,
        ];
        if !self.exclude_net_pay {
            fillable.push(TaxCategory::NetPay);
        }

        for category in fillable {
            if !a.is_missing(category) {
                continue;
            }
            let value = counterpart(b, category);
            if value > 0.0 {
                merged.set(category, value);
                filled.push(category);
            }
        }

        (merged, filled)
    }

    /// Quick check: do the two sources agree, without building a full result
    pub fn quick_agreement_check(&self, a: &TaxBreakdown, b: &TaxBreakdown, salary: f64) -> bool {
        salary > 0.0
            && self
                .compare(a, b, salary)
                .iter()
                .all(|d| within_tolerance(d.deviation, self.tolerance_pct))
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// B's value for a category, splitting combined FICA by statutory ratio
/// when B has no split figure of its own.
fn counterpart(b: &TaxBreakdown, category: TaxCategory) -> f64 {
    let direct = b.amount(category);
    if direct > 0.0 {
        return direct;
    }
    let combined = b.combined_fica().unwrap_or(0.0);
    match category {
        TaxCategory::Medicare => combined * MEDICARE_RATE / FICA_RATE,
        TaxCategory::SocialSecurity => combined * SOCIAL_SECURITY_RATE / FICA_RATE,
        _ => 0.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================
