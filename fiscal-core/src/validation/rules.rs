//! Validation rules
//!
//! Rules are configuration: which (table, field) they apply to (or global
//! when both are absent), a typed check, a severity and a priority. Loaded
//! from YAML, filtered to enabled rules at load time.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::model::Severity;
use crate::error::FiscalResult;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    pub rules: Vec<ValidationRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationRule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// None together with `field_name` = global rule
    #[serde(default, alias = "table")]
    pub table_name: Option<String>,
    #[serde(default, alias = "field")]
    pub field_name: Option<String>,
    pub check: RuleCheck,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub suggested_action: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl ValidationRule {
    pub fn new(name: impl Into<String>, check: RuleCheck) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            table_name: None,
            field_name: None,
            check,
            severity: Severity::default(),
            suggested_action: None,
            priority: 0,
            enabled: None,
        }
    }

    /// Scope the rule to one (table, field)
    pub fn for_field(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self.field_name = Some(field.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_global(&self) -> bool {
        self.table_name.is_none() && self.field_name.is_none()
    }

    pub fn applies_exactly_to(&self, table: &str, field: &str) -> bool {
        self.table_name.as_deref() == Some(table) && self.field_name.as_deref() == Some(field)
    }
}

fn default_threshold_percent() -> f64 {
    50.0
}

/// Typed check parameters, one variant per rule type
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Flag when the change from the prior fiscal year's aggregate exceeds
    /// `threshold_percent`
    YearOverYear {
        #[serde(default = "default_threshold_percent")]
        threshold_percent: f64,
    },
    /// Flag when the value leaves [min, max]; either bound may be absent
    RangeCheck {
        #[serde(default)]
        min: Option<Decimal>,
        #[serde(default)]
        max: Option<Decimal>,
    },
    /// Cross-table reconciliation. Extension point: never fires.
    Reconciliation {
        #[serde(default)]
        counterpart_table: Option<String>,
        #[serde(default)]
        counterpart_field: Option<String>,
        #[serde(default)]
        tolerance_percent: Option<f64>,
    },
    /// Derived-value formula check. Extension point: never fires.
    FormulaCheck {
        #[serde(default)]
        expression: Option<String>,
    },
}

impl RuleCheck {
    pub fn rule_type(&self) -> &'static str {
        match self {
            Self::YearOverYear { .. } => "year_over_year",
            Self::RangeCheck { .. } => "range_check",
            Self::Reconciliation { .. } => "reconciliation",
            Self::FormulaCheck { .. } => "formula_check",
        }
    }
}

/// A fired rule, before it becomes an anomaly flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub expected_value: Option<Decimal>,
    pub prior_value: Option<Decimal>,
    pub deviation_percent: Option<f64>,
    pub suggested_action: Option<String>,
}

impl RuleViolation {
    fn from_rule(rule: &ValidationRule, message: String) -> Self {
        Self {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            severity: rule.severity,
            message,
            expected_value: None,
            prior_value: None,
            deviation_percent: None,
            suggested_action: rule.suggested_action.clone(),
        }
    }
}

/// Percentage change from the prior value.
///
/// None when there is no prior value or it is exactly zero: the check is
/// skipped rather than reporting undefined growth. A change too large for
/// `Decimal` is computed in floating point instead.
pub fn year_over_year_change(value: Decimal, prior: Option<Decimal>) -> Option<f64> {
    let prior = prior?;
    if prior.is_zero() {
        return None;
    }
    value
        .checked_sub(prior)
        .and_then(|diff| diff.checked_div(prior))
        .and_then(|ratio| ratio.abs().checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|percent| percent.to_f64())
        .or_else(|| {
            let (value, prior) = (value.to_f64()?, prior.to_f64()?);
            Some(((value - prior) / prior).abs() * 100.0)
        })
}

pub fn check_year_over_year(
    rule: &ValidationRule,
    threshold_percent: f64,
    value: Decimal,
    prior: Option<Decimal>,
) -> Option<RuleViolation> {
    let deviation = year_over_year_change(value, prior)?;
    if deviation <= threshold_percent {
        return None;
    }
    let mut violation = RuleViolation::from_rule(
        rule,
        format!(
            "Year-over-year change of {:.1}% exceeds the {:.1}% threshold",
            deviation, threshold_percent
        ),
    );
    violation.expected_value = prior;
    violation.prior_value = prior;
    violation.deviation_percent = Some(deviation);
    Some(violation)
}

pub fn check_range(
    rule: &ValidationRule,
    min: Option<Decimal>,
    max: Option<Decimal>,
    value: Decimal,
) -> Option<RuleViolation> {
    if let Some(min) = min.filter(|min| value < *min) {
        let mut violation =
            RuleViolation::from_rule(rule, format!("Value {} is below minimum {}", value, min));
        violation.expected_value = Some(min);
        return Some(violation);
    }
    if let Some(max) = max.filter(|max| value > *max) {
        let mut violation =
            RuleViolation::from_rule(rule, format!("Value {} is above maximum {}", value, max));
        violation.expected_value = Some(max);
        return Some(violation);
    }
    None
}

/// Load rules from a YAML file
pub fn load_rules(path: &Path) -> FiscalResult<Vec<ValidationRule>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::error::FiscalError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let rules = load_rules_from_str(&content)?;

    tracing::info!("Loaded {} validation rules from {:?}", rules.len(), path);

    Ok(rules)
}

/// Load rules from a string
pub fn load_rules_from_str(yaml: &str) -> FiscalResult<Vec<ValidationRule>> {
    let config: RulesConfig = serde_yaml::from_str(yaml)?;
    Ok(config
        .rules
        .into_iter()
        .filter(|r| r.is_enabled())
        .collect())
}

/// Field-specific rules first, then global rules, each by priority
/// descending. Specificity outranks priority.
pub fn order_for_evaluation(
    mut specific: Vec<ValidationRule>,
    mut global: Vec<ValidationRule>,
) -> Vec<ValidationRule> {
    specific.sort_by(|a, b| b.priority.cmp(&a.priority));
    global.sort_by(|a, b| b.priority.cmp(&a.priority));
    specific.extend(global);
    specific
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yoy_rule() -> ValidationRule {
        ValidationRule::new(
            "revenue_swing",
            RuleCheck::YearOverYear {
                threshold_percent: 50.0,
            },
        )
    }

    #[test]
    fn test_year_over_year_flags_large_change() {
        let rule = yoy_rule();
        let violation = check_year_over_year(
            &rule,
            50.0,
            Decimal::from(160),
            Some(Decimal::from(100)),
        )
        .unwrap();
        assert_eq!(violation.deviation_percent, Some(60.0));
        assert_eq!(violation.prior_value, Some(Decimal::from(100)));
        assert_eq!(
            violation.message,
            "Year-over-year change of 60.0% exceeds the 50.0% threshold"
        );
    }

    #[test]
    fn test_year_over_year_within_threshold() {
        let rule = yoy_rule();
        assert!(check_year_over_year(&rule, 50.0, Decimal::from(150), Some(Decimal::from(100)))
            .is_none());
        assert!(check_year_over_year(&rule, 50.0, Decimal::from(40), Some(Decimal::from(100)))
            .is_some());
    }

    #[test]
    fn test_year_over_year_skips_zero_or_missing_prior() {
        let rule = yoy_rule();
        assert!(
            check_year_over_year(&rule, 50.0, Decimal::from(1_000_000), Some(Decimal::ZERO))
                .is_none()
        );
        assert!(check_year_over_year(&rule, 50.0, Decimal::from(160), None).is_none());
    }

    #[test]
    fn test_year_over_year_extreme_values_flag() {
        let rule = yoy_rule();

        let violation =
            check_year_over_year(&rule, 50.0, Decimal::MIN, Some(Decimal::from(100))).unwrap();
        let deviation = violation.deviation_percent.unwrap();
        assert!(deviation.is_finite() && deviation > 50.0);

        let violation =
            check_year_over_year(&rule, 50.0, Decimal::MAX, Some(Decimal::new(1, 3))).unwrap();
        assert!(violation.deviation_percent.unwrap().is_finite());

        assert!(year_over_year_change(Decimal::MAX, Some(Decimal::MIN)).is_some());
    }

    #[test]
    fn test_range_check() {
        let rule = ValidationRule::new(
            "non_negative",
            RuleCheck::RangeCheck {
                min: Some(Decimal::ZERO),
                max: None,
            },
        );
        let violation = check_range(&rule, Some(Decimal::ZERO), None, Decimal::from(-5)).unwrap();
        assert_eq!(violation.message, "Value -5 is below minimum 0");
        assert_eq!(violation.expected_value, Some(Decimal::ZERO));

        assert!(check_range(&rule, Some(Decimal::ZERO), None, Decimal::from(5)).is_none());
        assert!(check_range(&rule, None, Some(Decimal::from(10)), Decimal::from(11)).is_some());
    }

    #[test]
    fn test_parse_rules_yaml() {
        let yaml = r#"
rules:
  - name: revenue-yoy
    table: revenues
    field: amount
    priority: 10
    severity: CRITICAL
    check:
      rule_type: year_over_year
      threshold_percent: 25
  - name: non-negative
    check:
      rule_type: range_check
      min: 0
  - name: disabled-formula
    enabled: false
    check:
      rule_type: formula_check
"#;

        let rules = load_rules_from_str(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].applies_exactly_to("revenues", "amount"));
        assert_eq!(rules[0].severity, Severity::Critical);
        assert_eq!(
            rules[0].check,
            RuleCheck::YearOverYear {
                threshold_percent: 25.0
            }
        );
        assert!(rules[1].is_global());
        assert_eq!(rules[1].severity, Severity::Warning);
        assert_eq!(rules[1].check.rule_type(), "range_check");
    }

    #[test]
    fn test_default_threshold() {
        let yaml = r#"
rules:
  - name: yoy
    check: { rule_type: year_over_year }
"#;
        let rules = load_rules_from_str(yaml).unwrap();
        assert_eq!(
            rules[0].check,
            RuleCheck::YearOverYear {
                threshold_percent: 50.0
            }
        );
    }

    #[test]
    fn test_specific_rules_precede_global_regardless_of_priority() {
        let specific = vec![
            yoy_rule().for_field("revenues", "amount").with_priority(1),
            yoy_rule().for_field("revenues", "amount").with_priority(5),
        ];
        let global = vec![yoy_rule().with_priority(100)];

        let ordered = order_for_evaluation(specific, global);
        let priorities: Vec<i32> = ordered.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![5, 1, 100]);
    }
}
