//! Projection value objects

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scenario::ScenarioAssumptions;
use crate::error::{FiscalError, FiscalResult};
use crate::types::{FinancialFacts, FiscalYear};

/// Base-year figures every projection starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionBase {
    pub fiscal_year_id: Uuid,
    pub fiscal_year: i32,
    pub revenues: Decimal,
    pub expenditures: Decimal,
    pub pension_contributions: Decimal,
    pub fund_balance: Decimal,
}

impl ProjectionBase {
    /// Extract the base from a year's facts. Every field is required.
    pub fn from_facts(
        fiscal_year: &FiscalYear,
        facts: Option<&FinancialFacts>,
    ) -> FiscalResult<Self> {
        let empty = FinancialFacts::new(fiscal_year.id);
        let facts = facts.unwrap_or(&empty);

        let required = [
            ("total_revenues", facts.total_revenues),
            ("total_expenditures", facts.total_expenditures),
            ("pension_contributions", facts.pension_contributions),
            ("general_fund_balance", facts.general_fund_balance),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(FiscalError::IncompleteData {
                fiscal_year: fiscal_year.year,
                missing,
            });
        }

        let [revenues, expenditures, pension_contributions, fund_balance] =
            required.map(|(_, value)| value.unwrap_or_default());

        if pension_contributions > expenditures {
            return Err(FiscalError::InvalidInput(format!(
                "FY{} pension contributions {} exceed total expenditures {}",
                fiscal_year.year, pension_contributions, expenditures
            )));
        }

        Ok(Self {
            fiscal_year_id: fiscal_year.id,
            fiscal_year: fiscal_year.year,
            revenues,
            expenditures,
            pension_contributions,
            fund_balance,
        })
    }

    /// None when the difference leaves the `Decimal` range
    pub fn non_pension_expenditures(&self) -> Option<Decimal> {
        self.expenditures.checked_sub(self.pension_contributions)
    }
}

/// One projected fiscal year. Amounts are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    /// Years after the base year, starting at 1
    pub year_offset: u32,
    pub fiscal_year: i32,
    pub revenues: Decimal,
    pub expenditures: Decimal,
    pub pension_contributions: Decimal,
    pub operating_result: Decimal,
    pub beginning_balance: Decimal,
    pub ending_balance: Decimal,
    pub minimum_reserve: Decimal,
    pub is_deficit: bool,
    pub is_depleting_reserves: bool,
    pub reserves_below_minimum: bool,
    pub is_fiscal_cliff: bool,
}

/// A full horizon under one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub fiscal_year_id: Uuid,
    pub base_year: i32,
    pub base_balance: Decimal,
    pub scenario: ScenarioAssumptions,
    pub minimum_reserve_ratio: Decimal,
    pub years: Vec<ProjectionYear>,
}

impl ScenarioProjection {
    pub fn scenario_name(&self) -> &str {
        &self.scenario.name
    }

    /// First year whose ending balance is zero or negative
    pub fn cliff_year(&self) -> Option<&ProjectionYear> {
        self.years.iter().find(|y| y.is_fiscal_cliff)
    }

    pub fn first_deficit_year(&self) -> Option<i32> {
        self.years
            .iter()
            .find(|y| y.is_deficit)
            .map(|y| y.fiscal_year)
    }

    pub fn first_below_minimum_year(&self) -> Option<i32> {
        self.years
            .iter()
            .find(|y| y.reserves_below_minimum)
            .map(|y| y.fiscal_year)
    }

    pub fn final_balance(&self) -> Decimal {
        self.years
            .last()
            .map(|y| y.ending_balance)
            .unwrap_or(self.base_balance)
    }
}

/// Reserve exhaustion summary for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalCliffAnalysis {
    pub fiscal_year_id: Uuid,
    pub scenario: String,
    pub base_year: i32,
    pub horizon_years: u32,
    pub has_cliff: bool,
    pub cliff_year: Option<i32>,
    pub years_until_cliff: Option<u32>,
    pub cliff_balance: Option<Decimal>,
    pub first_deficit_year: Option<i32>,
    pub first_below_minimum_year: Option<i32>,
    /// Uniform revenue increase, in percent, that keeps every projected
    /// balance at or above zero
    pub revenue_increase_needed_percent: Option<Decimal>,
    /// Uniform expenditure reduction, in percent, with the same effect
    pub expenditure_decrease_needed_percent: Option<Decimal>,
    pub summary: String,
}

/// Best and worst scenario outcome for one projected year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonYear {
    pub fiscal_year: i32,
    pub best_scenario: String,
    pub best_balance: Decimal,
    pub worst_scenario: String,
    pub worst_balance: Decimal,
    pub spread: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub fiscal_year_id: Uuid,
    pub base_year: i32,
    pub projections: Vec<ScenarioProjection>,
    pub cliffs: Vec<FiscalCliffAnalysis>,
    pub years: Vec<ComparisonYear>,
}
