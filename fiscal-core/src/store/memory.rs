//! In-memory store
//!
//! A single `RwLock` guards all state, so every multi-record write is atomic
//! with respect to readers.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{severity_rank, FiscalStore, ValidationCommit};
use crate::scoring::RiskScore;
use crate::types::{DataLineage, FinancialFacts, FiscalYear, LineItem};
use crate::validation::{AnomalyFlag, QueueFilter, QueueItem, ValidationRecord, ValidationRule};

type LineageKey = (String, Uuid, String);

#[derive(Default)]
struct MemoryInner {
    fiscal_years: HashMap<Uuid, FiscalYear>,
    facts: HashMap<Uuid, FinancialFacts>,
    line_items: Vec<LineItem>,
    rules: Vec<ValidationRule>,
    queue: HashMap<Uuid, QueueItem>,
    flags: Vec<AnomalyFlag>,
    records: Vec<ValidationRecord>,
    lineage: HashMap<LineageKey, DataLineage>,
    risk_scores: Vec<RiskScore>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a rule set
    pub async fn with_rules(rules: Vec<ValidationRule>) -> Self {
        let store = Self::new();
        store.inner.write().await.rules = rules;
        store
    }
}

fn sorted_by_priority(mut rules: Vec<ValidationRule>) -> Vec<ValidationRule> {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    rules
}

#[async_trait]
impl FiscalStore for MemoryStore {
    async fn save_fiscal_year(&self, fiscal_year: &FiscalYear) -> Result<()> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.fiscal_years.values().any(|fy| {
            fy.id != fiscal_year.id && fy.city_id == fiscal_year.city_id && fy.year == fiscal_year.year
        });
        if duplicate {
            bail!(
                "Fiscal year {} already exists for city {}",
                fiscal_year.year,
                fiscal_year.city_id
            );
        }
        inner.fiscal_years.insert(fiscal_year.id, fiscal_year.clone());
        Ok(())
    }

    async fn load_fiscal_year(&self, id: Uuid) -> Result<Option<FiscalYear>> {
        Ok(self.inner.read().await.fiscal_years.get(&id).cloned())
    }

    async fn find_fiscal_year(&self, city_id: Uuid, year: i32) -> Result<Option<FiscalYear>> {
        let inner = self.inner.read().await;
        Ok(inner
            .fiscal_years
            .values()
            .find(|fy| fy.city_id == city_id && fy.year == year)
            .cloned())
    }

    async fn save_financial_facts(&self, facts: &FinancialFacts) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.facts.insert(facts.fiscal_year_id, facts.clone());
        Ok(())
    }

    async fn load_financial_facts(&self, fiscal_year_id: Uuid) -> Result<Option<FinancialFacts>> {
        Ok(self.inner.read().await.facts.get(&fiscal_year_id).cloned())
    }

    async fn save_line_item(&self, item: &LineItem) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.line_items.retain(|existing| existing.id != item.id);
        inner.line_items.push(item.clone());
        Ok(())
    }

    async fn sum_field(
        &self,
        city_id: Uuid,
        fiscal_year: i32,
        table_name: &str,
        field_name: &str,
    ) -> Result<Option<Decimal>> {
        let inner = self.inner.read().await;
        let mut matched = inner.line_items.iter().filter(|li| {
            li.city_id == city_id
                && li.fiscal_year == fiscal_year
                && li.table_name == table_name
                && li.field_name == field_name
        });
        let Some(first) = matched.next() else {
            return Ok(None);
        };
        let total = matched.try_fold(first.amount, |acc, li| acc.checked_add(li.amount));
        match total {
            Some(total) => Ok(Some(total)),
            None => bail!(
                "Sum of {}.{} for city {} FY{} overflows",
                table_name,
                field_name,
                city_id,
                fiscal_year
            ),
        }
    }

    async fn save_rule(&self, rule: &ValidationRule) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .rules
            .retain(|existing| existing.id != rule.id && existing.name != rule.name);
        inner.rules.push(rule.clone());
        Ok(())
    }

    async fn rules_for_field(
        &self,
        table_name: &str,
        field_name: &str,
    ) -> Result<Vec<ValidationRule>> {
        let inner = self.inner.read().await;
        Ok(sorted_by_priority(
            inner
                .rules
                .iter()
                .filter(|r| r.is_enabled() && r.applies_exactly_to(table_name, field_name))
                .cloned()
                .collect(),
        ))
    }

    async fn global_rules(&self) -> Result<Vec<ValidationRule>> {
        let inner = self.inner.read().await;
        Ok(sorted_by_priority(
            inner
                .rules
                .iter()
                .filter(|r| r.is_enabled() && r.is_global())
                .cloned()
                .collect(),
        ))
    }

    async fn insert_queue_item(&self, item: &QueueItem, flags: &[AnomalyFlag]) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.queue.contains_key(&item.id) {
            bail!("Queue item {} already exists", item.id);
        }
        inner.queue.insert(item.id, item.clone());
        inner.flags.extend(flags.iter().cloned());
        Ok(())
    }

    async fn load_queue_item(&self, id: Uuid) -> Result<Option<QueueItem>> {
        Ok(self.inner.read().await.queue.get(&id).cloned())
    }

    async fn update_queue_item(&self, item: &QueueItem) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.queue.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => bail!("Queue item {} does not exist", item.id),
        }
    }

    async fn load_flags(&self, queue_item_id: Uuid) -> Result<Vec<AnomalyFlag>> {
        let inner = self.inner.read().await;
        Ok(inner
            .flags
            .iter()
            .filter(|f| f.queue_item_id == queue_item_id)
            .cloned()
            .collect())
    }

    async fn list_queue_items(&self, filter: &QueueFilter) -> Result<Vec<QueueItem>> {
        let inner = self.inner.read().await;
        let mut items: Vec<QueueItem> = inner
            .queue
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            severity_rank(a.severity)
                .cmp(&severity_rank(b.severity))
                .then(a.entered_at.cmp(&b.entered_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(items)
    }

    async fn commit_validation(&self, commit: &ValidationCommit) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.queue.contains_key(&commit.item.id) {
            bail!("Queue item {} does not exist", commit.item.id);
        }

        inner.queue.insert(commit.item.id, commit.item.clone());
        for resolved in &commit.resolved_flags {
            if let Some(flag) = inner.flags.iter_mut().find(|f| f.id == resolved.id) {
                *flag = resolved.clone();
            }
        }
        inner.records.push(commit.record.clone());
        if let Some(lineage) = &commit.lineage {
            let key = (
                lineage.table_name.clone(),
                lineage.record_id,
                lineage.field_name.clone(),
            );
            inner.lineage.insert(key, lineage.clone());
        }
        Ok(())
    }

    async fn load_validation_records(&self, queue_item_id: Uuid) -> Result<Vec<ValidationRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.queue_item_id == queue_item_id)
            .cloned()
            .collect())
    }

    async fn save_lineage(&self, lineage: &DataLineage) -> Result<()> {
        let mut inner = self.inner.write().await;
        let key = (
            lineage.table_name.clone(),
            lineage.record_id,
            lineage.field_name.clone(),
        );
        inner.lineage.insert(key, lineage.clone());
        Ok(())
    }

    async fn load_lineage(
        &self,
        table_name: &str,
        record_id: Uuid,
        field_name: &str,
    ) -> Result<Option<DataLineage>> {
        let inner = self.inner.read().await;
        let key = (table_name.to_string(), record_id, field_name.to_string());
        Ok(inner.lineage.get(&key).cloned())
    }

    async fn save_risk_score(&self, score: &RiskScore) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.risk_scores.iter().any(|s| s.id == score.id) {
            bail!("Risk score {} already exists", score.id);
        }
        inner.risk_scores.push(score.clone());
        Ok(())
    }

    async fn load_risk_score(&self, id: Uuid) -> Result<Option<RiskScore>> {
        let inner = self.inner.read().await;
        Ok(inner.risk_scores.iter().find(|s| s.id == id).cloned())
    }

    async fn latest_risk_score(&self, fiscal_year_id: Uuid) -> Result<Option<RiskScore>> {
        let inner = self.inner.read().await;
        Ok(inner
            .risk_scores
            .iter()
            .filter(|s| s.fiscal_year_id == fiscal_year_id)
            .max_by_key(|s| s.calculated_at)
            .cloned())
    }

    async fn risk_score_history(&self, fiscal_year_id: Uuid) -> Result<Vec<RiskScore>> {
        let inner = self.inner.read().await;
        let mut history: Vec<RiskScore> = inner
            .risk_scores
            .iter()
            .filter(|s| s.fiscal_year_id == fiscal_year_id)
            .cloned()
            .collect();
        history.reverse();
        history.sort_by(|a, b| b.calculated_at.cmp(&a.calculated_at));
        Ok(history)
    }

    async fn mark_risk_score_validated(
        &self,
        id: Uuid,
        validated_by: &str,
        validated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.risk_scores.iter_mut().find(|s| s.id == id) {
            Some(score) => {
                score.validated = true;
                score.validated_by = Some(validated_by.to_string());
                score.validated_at = Some(validated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RuleCheck;

    #[tokio::test]
    async fn test_sum_field_aggregates_line_items() {
        let store = MemoryStore::new();
        let city = Uuid::new_v4();

        assert_eq!(
            store.sum_field(city, 2022, "revenues", "amount").await.unwrap(),
            None
        );

        for amount in [40, 60] {
            store
                .save_line_item(&LineItem::new(city, 2022, "revenues", "amount", Decimal::from(amount)))
                .await
                .unwrap();
        }
        store
            .save_line_item(&LineItem::new(city, 2023, "revenues", "amount", Decimal::from(999)))
            .await
            .unwrap();

        assert_eq!(
            store.sum_field(city, 2022, "revenues", "amount").await.unwrap(),
            Some(Decimal::from(100))
        );
    }

    #[tokio::test]
    async fn test_sum_field_overflow_is_an_error() {
        let store = MemoryStore::new();
        let city = Uuid::new_v4();
        for _ in 0..2 {
            store
                .save_line_item(&LineItem::new(city, 2022, "revenues", "amount", Decimal::MAX))
                .await
                .unwrap();
        }

        assert!(store.sum_field(city, 2022, "revenues", "amount").await.is_err());
    }

    #[tokio::test]
    async fn test_rule_listing_by_scope_and_priority() {
        let check = RuleCheck::FormulaCheck { expression: None };
        let rules = vec![
            ValidationRule::new("low", check.clone())
                .for_field("revenues", "amount")
                .with_priority(1),
            ValidationRule::new("high", check.clone())
                .for_field("revenues", "amount")
                .with_priority(9),
            ValidationRule::new("other-field", check.clone()).for_field("revenues", "source"),
            ValidationRule::new("global", check.clone()).with_priority(50),
        ];
        let store = MemoryStore::with_rules(rules).await;

        let specific = store.rules_for_field("revenues", "amount").await.unwrap();
        let names: Vec<&str> = specific.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low"]);

        let global = store.global_rules().await.unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].name, "global");
    }

    #[tokio::test]
    async fn test_duplicate_fiscal_year_rejected() {
        let store = MemoryStore::new();
        let city = Uuid::new_v4();
        store.save_fiscal_year(&FiscalYear::new(city, 2023)).await.unwrap();
        assert!(store
            .save_fiscal_year(&FiscalYear::new(city, 2023))
            .await
            .is_err());
    }
}
