//! Shared record types
//!
//! Fiscal years, the financial facts transcribed for them, raw line items used
//! by aggregate queries, and the provenance (lineage) attached to entered
//! values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A city's fiscal year and its data-entry completeness flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct FiscalYear {
    pub id: Uuid,
    pub city_id: Uuid,
    /// Fiscal year label, e.g. 2023 for FY2022-23
    pub year: i32,
    pub revenues_complete: bool,
    pub expenditures_complete: bool,
    pub pension_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl FiscalYear {
    pub fn new(city_id: Uuid, year: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            city_id,
            year,
            revenues_complete: false,
            expenditures_complete: false,
            pension_complete: false,
            created_at: Utc::now(),
        }
    }

    /// Mark every data area as entered
    pub fn completed(mut self) -> Self {
        self.revenues_complete = true;
        self.expenditures_complete = true;
        self.pension_complete = true;
        self
    }

    /// Data areas that must be complete before a risk score may be requested
    pub fn missing_for_scoring(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.revenues_complete {
            missing.push("revenues");
        }
        if !self.expenditures_complete {
            missing.push("expenditures");
        }
        missing
    }
}

/// Aggregated financial facts transcribed from a CAFR and pension valuation.
///
/// Every field is optional: a missing fact makes the indicators that depend
/// on it unavailable rather than failing the calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct FinancialFacts {
    pub fiscal_year_id: Uuid,
    pub total_revenues: Option<Decimal>,
    pub total_expenditures: Option<Decimal>,
    pub intergovernmental_revenues: Option<Decimal>,
    /// Unassigned general fund balance (the spendable reserve)
    pub unassigned_fund_balance: Option<Decimal>,
    /// Total ending general fund balance
    pub general_fund_balance: Option<Decimal>,
    pub cash_and_investments: Option<Decimal>,
    pub pension_contributions: Option<Decimal>,
    pub pension_total_liability: Option<Decimal>,
    pub pension_fiduciary_net_position: Option<Decimal>,
    pub debt_service: Option<Decimal>,
}

impl FinancialFacts {
    pub fn new(fiscal_year_id: Uuid) -> Self {
        Self {
            fiscal_year_id,
            ..Default::default()
        }
    }
}

/// One raw transcribed amount; the unit summed by year-over-year checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct LineItem {
    pub id: Uuid,
    pub city_id: Uuid,
    pub fiscal_year: i32,
    pub table_name: String,
    pub field_name: String,
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(
        city_id: Uuid,
        fiscal_year: i32,
        table_name: impl Into<String>,
        field_name: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            city_id,
            fiscal_year,
            table_name: table_name.into(),
            field_name: field_name.into(),
            amount,
        }
    }
}

/// Provenance of an entered value: where it was transcribed from and how
/// much it is trusted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct DataLineage {
    pub table_name: String,
    pub record_id: Uuid,
    pub field_name: String,
    pub source_document: Option<String>,
    pub source_page: Option<i32>,
    /// 0-100
    pub confidence_score: i32,
    pub updated_at: DateTime<Utc>,
}

impl DataLineage {
    pub const MIN_CONFIDENCE: i32 = 0;
    pub const MAX_CONFIDENCE: i32 = 100;

    pub fn new(
        table_name: impl Into<String>,
        record_id: Uuid,
        field_name: impl Into<String>,
        confidence_score: i32,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            record_id,
            field_name: field_name.into(),
            source_document: None,
            source_page: None,
            confidence_score: confidence_score.clamp(Self::MIN_CONFIDENCE, Self::MAX_CONFIDENCE),
            updated_at: Utc::now(),
        }
    }

    /// Nudge confidence by a signed delta, clamped to [0, 100]
    pub fn adjust_confidence(&mut self, delta: i32) {
        self.confidence_score = self
            .confidence_score
            .saturating_add(delta)
            .clamp(Self::MIN_CONFIDENCE, Self::MAX_CONFIDENCE);
        self.updated_at = Utc::now();
    }
}
