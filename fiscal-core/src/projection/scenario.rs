//! Growth scenarios

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FiscalError, FiscalResult};

pub const BASE: &str = "base";
pub const OPTIMISTIC: &str = "optimistic";
pub const PESSIMISTIC: &str = "pessimistic";

/// Annual growth assumptions, as decimal fractions (0.025 = 2.5%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    pub name: String,
    pub revenue_growth: Decimal,
    /// Growth of expenditures other than pension contributions
    pub expenditure_growth: Decimal,
    pub pension_growth: Decimal,
}

impl ScenarioAssumptions {
    pub fn new(
        name: impl Into<String>,
        revenue_growth: Decimal,
        expenditure_growth: Decimal,
        pension_growth: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            revenue_growth,
            expenditure_growth,
            pension_growth,
        }
    }

    pub fn base() -> Self {
        Self::new(
            BASE,
            Decimal::new(25, 3),
            Decimal::new(30, 3),
            Decimal::new(60, 3),
        )
    }

    pub fn optimistic() -> Self {
        Self::new(
            OPTIMISTIC,
            Decimal::new(35, 3),
            Decimal::new(25, 3),
            Decimal::new(40, 3),
        )
    }

    pub fn pessimistic() -> Self {
        Self::new(
            PESSIMISTIC,
            Decimal::new(15, 3),
            Decimal::new(35, 3),
            Decimal::new(80, 3),
        )
    }

    /// The three canonical scenarios, base first
    pub fn canonical() -> Vec<Self> {
        vec![Self::base(), Self::optimistic(), Self::pessimistic()]
    }
}

/// Find a scenario by name, ignoring case
pub fn find_scenario<'a>(
    scenarios: &'a [ScenarioAssumptions],
    name: &str,
) -> FiscalResult<&'a ScenarioAssumptions> {
    scenarios
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| FiscalError::scenario_not_found(name))
}
