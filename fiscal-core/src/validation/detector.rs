//! Anomaly Detector
//!
//! Checks a newly entered value against the applicable validation rules.
//! Any violation produces one FLAGGED queue item carrying one anomaly flag per
//! fired rule; a clean value persists nothing.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{AnomalyFlag, QueueItem, QueueStatus, Severity};
use super::rules::{
    check_range, check_year_over_year, order_for_evaluation, RuleCheck, RuleViolation,
    ValidationRule,
};
use crate::error::FiscalResult;
use crate::store::FiscalStore;

/// A manually entered value to check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnteredValue {
    pub table_name: String,
    pub record_id: Uuid,
    pub field_name: String,
    pub value: Decimal,
    pub city_id: Uuid,
    pub fiscal_year: i32,
    pub entered_by: String,
}

pub struct AnomalyDetector {
    store: Arc<dyn FiscalStore>,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn FiscalStore>) -> Self {
        Self { store }
    }

    /// Rules for a (table, field): field-specific first, then global
    pub async fn applicable_rules(
        &self,
        table_name: &str,
        field_name: &str,
    ) -> FiscalResult<Vec<ValidationRule>> {
        let specific = self.store.rules_for_field(table_name, field_name).await?;
        let global = self.store.global_rules().await?;
        Ok(order_for_evaluation(specific, global))
    }

    /// Evaluate every applicable rule. Returns the created queue item, or
    /// None when nothing fired.
    pub async fn check_value(&self, entry: &EnteredValue) -> FiscalResult<Option<QueueItem>> {
        let rules = self
            .applicable_rules(&entry.table_name, &entry.field_name)
            .await?;

        let mut violations = Vec::new();
        for rule in &rules {
            if let Some(violation) = self.evaluate_rule(rule, entry).await? {
                debug!(
                    "Rule '{}' fired for {}.{}: {}",
                    rule.name, entry.table_name, entry.field_name, violation.message
                );
                violations.push(violation);
            }
        }

        if violations.is_empty() {
            debug!(
                "{}.{} = {} passed {} rules",
                entry.table_name,
                entry.field_name,
                entry.value,
                rules.len()
            );
            return Ok(None);
        }

        let (item, flags) = build_queue_item(entry, &violations);
        self.store.insert_queue_item(&item, &flags).await?;

        info!(
            "Flagged {}.{} (record {}) with {} anomalies, severity {}",
            entry.table_name,
            entry.field_name,
            entry.record_id,
            flags.len(),
            item.severity
        );

        Ok(Some(item))
    }

    async fn evaluate_rule(
        &self,
        rule: &ValidationRule,
        entry: &EnteredValue,
    ) -> FiscalResult<Option<RuleViolation>> {
        match &rule.check {
            RuleCheck::YearOverYear { threshold_percent } => {
                let prior = match entry.fiscal_year.checked_sub(1) {
                    Some(prior_year) => {
                        self.store
                            .sum_field(
                                entry.city_id,
                                prior_year,
                                &entry.table_name,
                                &entry.field_name,
                            )
                            .await?
                    }
                    None => None,
                };
                Ok(check_year_over_year(
                    rule,
                    *threshold_percent,
                    entry.value,
                    prior,
                ))
            }
            RuleCheck::RangeCheck { min, max } => Ok(check_range(rule, *min, *max, entry.value)),
            RuleCheck::Reconciliation { .. } | RuleCheck::FormulaCheck { .. } => Ok(None),
        }
    }
}

/// Queue item summarised from the first violation, severity the highest
/// among all of them, and one flag per violation
pub fn build_queue_item(
    entry: &EnteredValue,
    violations: &[RuleViolation],
) -> (QueueItem, Vec<AnomalyFlag>) {
    let now = Utc::now();
    let first = violations.first();
    let severity = violations
        .iter()
        .map(|v| v.severity)
        .max()
        .unwrap_or(Severity::Info);

    let item = QueueItem {
        id: Uuid::new_v4(),
        table_name: entry.table_name.clone(),
        record_id: entry.record_id,
        field_name: entry.field_name.clone(),
        city_id: entry.city_id,
        fiscal_year: entry.fiscal_year,
        entered_value: entry.value,
        status: QueueStatus::Flagged,
        severity,
        rule_name: first.map(|v| v.rule_name.clone()),
        rule_message: first.map(|v| v.message.clone()),
        prior_value: first.and_then(|v| v.prior_value),
        deviation_percent: first.and_then(|v| v.deviation_percent),
        entered_by: entry.entered_by.clone(),
        entered_at: now,
        assigned_to: None,
        notes: None,
        is_deleted: false,
        updated_at: now,
    };

    let flags = violations
        .iter()
        .map(|v| AnomalyFlag {
            id: Uuid::new_v4(),
            queue_item_id: item.id,
            rule_id: v.rule_id,
            rule_name: v.rule_name.clone(),
            severity: v.severity,
            message: v.message.clone(),
            entered_value: entry.value,
            expected_value: v.expected_value,
            prior_value: v.prior_value,
            deviation_percent: v.deviation_percent,
            suggested_action: v.suggested_action.clone(),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            created_at: now,
        })
        .collect();

    (item, flags)
}
