//! Indicator Catalog
//!
//! Immutable reference data: which indicators exist, which category each
//! rolls up into, and the threshold ladder that maps a raw value onto a
//! 0-100 risk sub-score. Built once and shared; nothing mutates it at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::error::{FiscalError, FiscalResult};

/// Indicator codes in the reference catalog
pub mod codes {
    pub const FUND_BALANCE_RATIO: &str = "fund_balance_ratio";
    pub const DAYS_CASH_ON_HAND: &str = "days_cash_on_hand";
    pub const OPERATING_BALANCE_RATIO: &str = "operating_balance_ratio";
    pub const STRUCTURAL_GROWTH_GAP: &str = "structural_growth_gap";
    pub const PENSION_FUNDED_RATIO: &str = "pension_funded_ratio";
    pub const UAL_TO_REVENUE_RATIO: &str = "ual_to_revenue_ratio";
    pub const PENSION_COST_RATIO: &str = "pension_cost_ratio";
    pub const INTERGOVERNMENTAL_DEPENDENCY: &str = "intergovernmental_dependency";
    pub const DEBT_SERVICE_RATIO: &str = "debt_service_ratio";
}

// ============================================================================
// Categories
// ============================================================================

/// The five fixed groupings indicators roll up into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Liquidity,
    Structural,
    Pension,
    Revenue,
    Debt,
}

impl Category {
    /// Every category in reporting order
    pub const ALL: [Category; 5] = [
        Category::Liquidity,
        Category::Structural,
        Category::Pension,
        Category::Revenue,
        Category::Debt,
    ];

    /// Fixed weight in the overall score. The five weights sum to 1.0.
    pub const fn weight(self) -> f64 {
        match self {
            Category::Liquidity => 0.25,
            Category::Structural => 0.25,
            Category::Pension => 0.30,
            Category::Revenue => 0.10,
            Category::Debt => 0.10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Liquidity => "liquidity",
            Category::Structural => "structural",
            Category::Pension => "pension",
            Category::Revenue => "revenue",
            Category::Debt => "debt",
        }
    }

    /// Human label used in narratives
    pub fn label(&self) -> &'static str {
        match self {
            Category::Liquidity => "liquidity",
            Category::Structural => "structural balance",
            Category::Pension => "pension obligations",
            Category::Revenue => "revenue stability",
            Category::Debt => "debt burden",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Threshold buckets
// ============================================================================

/// Which threshold band a raw value falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdBucket {
    Healthy,
    Adequate,
    Warning,
    Critical,
}

impl ThresholdBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Adequate => "adequate",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ThresholdBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThresholdBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Self::Healthy),
            "adequate" => Ok(Self::Adequate),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown threshold bucket: {}", s)),
        }
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// The four threshold values of an indicator, in its natural units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub healthy: f64,
    pub adequate: f64,
    pub warning: f64,
    pub critical: f64,
}

/// Reference definition of one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub code: String,
    pub name: String,
    pub category: Category,
    pub thresholds: Thresholds,
    pub higher_is_better: bool,
    pub unit: String,
}

impl IndicatorDefinition {
    fn new(
        code: &str,
        name: &str,
        category: Category,
        [healthy, adequate, warning, critical]: [f64; 4],
        higher_is_better: bool,
        unit: &str,
    ) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            category,
            thresholds: Thresholds {
                healthy,
                adequate,
                warning,
                critical,
            },
            higher_is_better,
            unit: unit.to_string(),
        }
    }

    /// Thresholds flipped so that larger always means worse
    fn ladder(&self) -> [f64; 4] {
        let t = self.thresholds;
        let ladder = [t.healthy, t.adequate, t.warning, t.critical];
        if self.higher_is_better {
            ladder.map(|x| -x)
        } else {
            ladder
        }
    }

    /// Map a raw value onto a 0-100 risk score and its threshold bucket.
    ///
    /// Scores interpolate linearly inside each band: healthy 0-25,
    /// adequate 25-50, warning 50-75, critical 75-100.
    pub fn evaluate(&self, value: f64) -> (f64, ThresholdBucket) {
        let v = if self.higher_is_better { -value } else { value };
        let [h, a, w, c] = self.ladder();

        let (score, bucket) = if v <= h {
            (25.0 * (1.0 - fraction(h - v, a - h)), ThresholdBucket::Healthy)
        } else if v <= a {
            (25.0 + 25.0 * fraction(v - h, a - h), ThresholdBucket::Adequate)
        } else if v <= w {
            (50.0 + 25.0 * fraction(v - a, w - a), ThresholdBucket::Warning)
        } else {
            (75.0 + 25.0 * fraction(v - w, c - w), ThresholdBucket::Critical)
        };

        (score.clamp(0.0, 100.0), bucket)
    }

    /// Deterministic one-sentence reading of a value
    pub fn interpret(&self, value: f64, bucket: ThresholdBucket) -> String {
        let t = self.thresholds;
        let shown = self.format_value(value);
        match bucket {
            ThresholdBucket::Healthy => format!(
                "{} of {} meets the healthy threshold of {}.",
                self.name,
                shown,
                self.format_value(t.healthy)
            ),
            ThresholdBucket::Adequate => format!(
                "{} of {} is adequate but short of the healthy threshold of {}.",
                self.name,
                shown,
                self.format_value(t.healthy)
            ),
            ThresholdBucket::Warning => format!(
                "{} of {} has moved past the adequate threshold of {}.",
                self.name,
                shown,
                self.format_value(t.adequate)
            ),
            ThresholdBucket::Critical => format!(
                "{} of {} is beyond the warning threshold of {} (critical level {}).",
                self.name,
                shown,
                self.format_value(t.warning),
                self.format_value(t.critical)
            ),
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        if self.unit == "%" {
            format!("{:.1}%", value)
        } else {
            format!("{:.1} {}", value, self.unit)
        }
    }
}

fn fraction(distance: f64, span: f64) -> f64 {
    if span <= 0.0 {
        1.0
    } else {
        (distance / span).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The full, validated set of indicator definitions
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCatalog {
    definitions: Vec<IndicatorDefinition>,
}

impl IndicatorCatalog {
    /// The shared reference catalog (9 indicators)
    pub fn reference() -> Arc<IndicatorCatalog> {
        static CATALOG: OnceLock<Arc<IndicatorCatalog>> = OnceLock::new();
        CATALOG
            .get_or_init(|| {
                Arc::new(IndicatorCatalog {
                    definitions: reference_definitions(),
                })
            })
            .clone()
    }

    /// Build a catalog from administrator-maintained definitions
    pub fn new(definitions: Vec<IndicatorDefinition>) -> FiscalResult<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.code.as_str()) {
                return Err(FiscalError::Config(format!(
                    "Duplicate indicator code '{}'",
                    def.code
                )));
            }
            let ladder = def.ladder();
            if ladder.windows(2).any(|pair| pair[0] > pair[1]) {
                return Err(FiscalError::Config(format!(
                    "Thresholds for '{}' are not ordered from healthy to critical",
                    def.code
                )));
            }
        }
        for category in Category::ALL {
            if !definitions.iter().any(|d| d.category == category) {
                return Err(FiscalError::Config(format!(
                    "Category '{}' has no indicators",
                    category
                )));
            }
        }
        Ok(Self { definitions })
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorDefinition> {
        self.definitions.iter()
    }

    /// Total indicator count; available + missing always equals this
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn count_in(&self, category: Category) -> usize {
        self.definitions
            .iter()
            .filter(|d| d.category == category)
            .count()
    }

    /// Equal split of the category weight across its mapped indicators.
    ///
    /// A simplification, not a calibrated weighting.
    pub fn weight_within_category(&self, category: Category) -> f64 {
        match self.count_in(category) {
            0 => 0.0,
            n => category.weight() / n as f64,
        }
    }
}

fn reference_definitions() -> Vec<IndicatorDefinition> {
    use Category::*;
    vec![
        IndicatorDefinition::new(
            codes::FUND_BALANCE_RATIO,
            "Fund Balance Ratio",
            Liquidity,
            [25.0, 16.7, 8.3, 0.0],
            true,
            "%",
        ),
        IndicatorDefinition::new(
            codes::DAYS_CASH_ON_HAND,
            "Days of Cash on Hand",
            Liquidity,
            [180.0, 90.0, 45.0, 15.0],
            true,
            "days",
        ),
        IndicatorDefinition::new(
            codes::OPERATING_BALANCE_RATIO,
            "Operating Balance Ratio",
            Structural,
            [5.0, 0.0, -5.0, -10.0],
            true,
            "%",
        ),
        IndicatorDefinition::new(
            codes::STRUCTURAL_GROWTH_GAP,
            "Expenditure vs Revenue Growth Gap",
            Structural,
            [0.0, 1.0, 3.0, 5.0],
            false,
            "pp",
        ),
        IndicatorDefinition::new(
            codes::PENSION_FUNDED_RATIO,
            "Pension Funded Ratio",
            Pension,
            [90.0, 80.0, 70.0, 60.0],
            true,
            "%",
        ),
        IndicatorDefinition::new(
            codes::UAL_TO_REVENUE_RATIO,
            "Unfunded Pension Liability to Revenue",
            Pension,
            [50.0, 100.0, 200.0, 300.0],
            false,
            "%",
        ),
        IndicatorDefinition::new(
            codes::PENSION_COST_RATIO,
            "Pension Cost Ratio",
            Pension,
            [10.0, 15.0, 20.0, 25.0],
            false,
            "%",
        ),
        IndicatorDefinition::new(
            codes::INTERGOVERNMENTAL_DEPENDENCY,
            "Intergovernmental Revenue Dependency",
            Revenue,
            [15.0, 25.0, 35.0, 50.0],
            false,
            "%",
        ),
        IndicatorDefinition::new(
            codes::DEBT_SERVICE_RATIO,
            "Debt Service Ratio",
            Debt,
            [5.0, 10.0, 15.0, 20.0],
            false,
            "%",
        ),
    ]
}
