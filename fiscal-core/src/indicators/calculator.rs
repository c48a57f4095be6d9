//! Indicator Calculator
//!
//! Turns a fiscal year's financial facts into raw ratios and scores each one
//! against its catalog thresholds. Indicators whose inputs are missing, or
//! whose denominator is zero, come back unavailable.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{codes, Category, IndicatorCatalog, ThresholdBucket};
use crate::types::FinancialFacts;

/// Raw indicator outcome for one fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub code: String,
    pub indicator_name: String,
    pub category: Category,
    pub available: bool,
    pub value: Option<f64>,
    pub score: Option<f64>,
    pub threshold_category: Option<ThresholdBucket>,
    pub interpretation: Option<String>,
}

/// Computes every catalog indicator for a fiscal year
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    catalog: Arc<IndicatorCatalog>,
}

impl IndicatorCalculator {
    pub fn new(catalog: Arc<IndicatorCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &IndicatorCatalog {
        &self.catalog
    }

    /// Results in catalog order, one per defined indicator
    pub fn calculate(
        &self,
        current: &FinancialFacts,
        prior: Option<&FinancialFacts>,
    ) -> Vec<IndicatorResult> {
        self.catalog
            .iter()
            .map(|def| {
                let value = raw_value(&def.code, current, prior);
                match value {
                    Some(v) => {
                        let (score, bucket) = def.evaluate(v);
                        IndicatorResult {
                            code: def.code.clone(),
                            indicator_name: def.name.clone(),
                            category: def.category,
                            available: true,
                            value: Some(v),
                            score: Some(score),
                            threshold_category: Some(bucket),
                            interpretation: Some(def.interpret(v, bucket)),
                        }
                    }
                    None => IndicatorResult {
                        code: def.code.clone(),
                        indicator_name: def.name.clone(),
                        category: def.category,
                        available: false,
                        value: None,
                        score: None,
                        threshold_category: None,
                        interpretation: None,
                    },
                }
            })
            .collect()
    }
}

/// Raw ratio for an indicator code; None when it cannot be computed
pub fn raw_value(
    code: &str,
    current: &FinancialFacts,
    prior: Option<&FinancialFacts>,
) -> Option<f64> {
    let f = current;
    match code {
        codes::FUND_BALANCE_RATIO => percent(f.unassigned_fund_balance?, f.total_expenditures?),
        codes::DAYS_CASH_ON_HAND => ratio(
            f.cash_and_investments?.checked_mul(Decimal::from(365))?,
            f.total_expenditures?,
        ),
        codes::OPERATING_BALANCE_RATIO => {
            let expenditures = f.total_expenditures?;
            percent(f.total_revenues?.checked_sub(expenditures)?, expenditures)
        }
        codes::STRUCTURAL_GROWTH_GAP => {
            let p = prior?;
            let expenditure_growth = growth(f.total_expenditures?, p.total_expenditures?)?;
            let revenue_growth = growth(f.total_revenues?, p.total_revenues?)?;
            Some(expenditure_growth - revenue_growth)
        }
        codes::PENSION_FUNDED_RATIO => percent(
            f.pension_fiduciary_net_position?,
            f.pension_total_liability?,
        ),
        codes::UAL_TO_REVENUE_RATIO => {
            let unfunded = f
                .pension_total_liability?
                .checked_sub(f.pension_fiduciary_net_position?)?;
            percent(unfunded, f.total_revenues?)
        }
        codes::PENSION_COST_RATIO => percent(f.pension_contributions?, f.total_expenditures?),
        codes::INTERGOVERNMENTAL_DEPENDENCY => {
            percent(f.intergovernmental_revenues?, f.total_revenues?)
        }
        codes::DEBT_SERVICE_RATIO => percent(f.debt_service?, f.total_revenues?),
        _ => None,
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)?.to_f64()
}

fn percent(numerator: Decimal, denominator: Decimal) -> Option<f64> {
    ratio(numerator.checked_mul(Decimal::ONE_HUNDRED)?, denominator)
}

fn growth(current: Decimal, prior: Decimal) -> Option<f64> {
    percent(current.checked_sub(prior)?, prior)
}
