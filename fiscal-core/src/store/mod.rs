//! Storage collaborator
//!
//! The engines operate exclusively through [`FiscalStore`], so the record
//! store is pluggable: [`MemoryStore`] for tests and local runs, Postgres
//! (feature `postgres`) for production. Every method that writes more than
//! one record does so atomically.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::scoring::RiskScore;
use crate::types::{DataLineage, FinancialFacts, FiscalYear, LineItem};
use crate::validation::{
    AnomalyFlag, QueueFilter, QueueItem, Severity, ValidationRecord, ValidationRule,
};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgSettings, PostgresStore};

/// Everything one validation action writes, persisted as a unit
#[derive(Debug, Clone)]
pub struct ValidationCommit {
    pub item: QueueItem,
    /// Flags whose resolution changed in this action
    pub resolved_flags: Vec<AnomalyFlag>,
    pub record: ValidationRecord,
    /// Lineage with its adjusted confidence, when an adjustment was requested
    pub lineage: Option<DataLineage>,
}

#[async_trait]
pub trait FiscalStore: Send + Sync {
    // ── Fiscal years ──

    async fn save_fiscal_year(&self, fiscal_year: &FiscalYear) -> Result<()>;
    async fn load_fiscal_year(&self, id: Uuid) -> Result<Option<FiscalYear>>;
    async fn find_fiscal_year(&self, city_id: Uuid, year: i32) -> Result<Option<FiscalYear>>;

    // ── Financial facts ──

    async fn save_financial_facts(&self, facts: &FinancialFacts) -> Result<()>;
    async fn load_financial_facts(&self, fiscal_year_id: Uuid) -> Result<Option<FinancialFacts>>;

    // ── Line items ──

    async fn save_line_item(&self, item: &LineItem) -> Result<()>;

    /// Sum of amounts for (city, fiscal year, table, field); None when no
    /// line item exists
    async fn sum_field(
        &self,
        city_id: Uuid,
        fiscal_year: i32,
        table_name: &str,
        field_name: &str,
    ) -> Result<Option<Decimal>>;

    // ── Validation rules ──

    /// Upsert; rule names are unique
    async fn save_rule(&self, rule: &ValidationRule) -> Result<()>;

    /// Enabled rules bound to exactly (table, field), priority descending
    async fn rules_for_field(&self, table_name: &str, field_name: &str)
        -> Result<Vec<ValidationRule>>;

    /// Enabled rules with neither table nor field, priority descending
    async fn global_rules(&self) -> Result<Vec<ValidationRule>>;

    // ── Validation queue ──

    /// Insert a queue item together with its anomaly flags
    async fn insert_queue_item(&self, item: &QueueItem, flags: &[AnomalyFlag]) -> Result<()>;
    async fn load_queue_item(&self, id: Uuid) -> Result<Option<QueueItem>>;
    async fn update_queue_item(&self, item: &QueueItem) -> Result<()>;
    async fn load_flags(&self, queue_item_id: Uuid) -> Result<Vec<AnomalyFlag>>;

    /// Non-deleted items matching the filter, CRITICAL first, then oldest first
    async fn list_queue_items(&self, filter: &QueueFilter) -> Result<Vec<QueueItem>>;

    /// Item update, flag resolutions, audit record and lineage in one unit
    async fn commit_validation(&self, commit: &ValidationCommit) -> Result<()>;

    /// Audit records for an item, oldest first
    async fn load_validation_records(&self, queue_item_id: Uuid) -> Result<Vec<ValidationRecord>>;

    // ── Data lineage ──

    async fn save_lineage(&self, lineage: &DataLineage) -> Result<()>;
    async fn load_lineage(
        &self,
        table_name: &str,
        record_id: Uuid,
        field_name: &str,
    ) -> Result<Option<DataLineage>>;

    // ── Risk scores ──

    /// Insert a risk score and its indicator score children
    async fn save_risk_score(&self, score: &RiskScore) -> Result<()>;
    async fn load_risk_score(&self, id: Uuid) -> Result<Option<RiskScore>>;

    /// Most recently calculated score for the fiscal year
    async fn latest_risk_score(&self, fiscal_year_id: Uuid) -> Result<Option<RiskScore>>;

    /// All scores for the fiscal year, newest first
    async fn risk_score_history(&self, fiscal_year_id: Uuid) -> Result<Vec<RiskScore>>;

    /// Returns false when no such score exists
    async fn mark_risk_score_validated(
        &self,
        id: Uuid,
        validated_by: &str,
        validated_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Sort rank used for queue listings: CRITICAL first
pub(crate) fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}
