//! Scenario Projection Engine
//!
//! Grows base-year revenues, non-pension expenditures and pension
//! contributions at each scenario's rates and rolls the fund balance forward:
//!
//! ```text
//! revenues[k]     = R0 * (1 + revenue_growth)^k
//! expenditures[k] = (E0 - P0) * (1 + expenditure_growth)^k + P0 * (1 + pension_growth)^k
//! balance[k]      = balance[k-1] + revenues[k] - expenditures[k]
//! ```

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::cliff::{analyze_cliff, compare_scenarios};
use super::model::{
    FiscalCliffAnalysis, ProjectionBase, ProjectionYear, ScenarioComparison, ScenarioProjection,
};
use super::scenario::{find_scenario, ScenarioAssumptions};
use crate::error::{FiscalError, FiscalResult};
use crate::store::FiscalStore;

pub const DEFAULT_HORIZON_YEARS: u32 = 5;
pub const MAX_HORIZON_YEARS: u32 = 30;

/// Two months of expenditures
pub fn default_minimum_reserve_ratio() -> Decimal {
    Decimal::new(167, 3)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub horizon_years: u32,
    /// Policy minimum ending balance as a fraction of that year's expenditures
    pub minimum_reserve_ratio: Decimal,
    pub scenarios: Vec<ScenarioAssumptions>,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
            minimum_reserve_ratio: default_minimum_reserve_ratio(),
            scenarios: ScenarioAssumptions::canonical(),
        }
    }
}

impl ProjectionSettings {
    pub fn validate(&self) -> FiscalResult<()> {
        if self.horizon_years == 0 || self.horizon_years > MAX_HORIZON_YEARS {
            return Err(FiscalError::Config(format!(
                "projection horizon must be between 1 and {} years, got {}",
                MAX_HORIZON_YEARS, self.horizon_years
            )));
        }
        if self.minimum_reserve_ratio.is_sign_negative() {
            return Err(FiscalError::Config(
                "minimum reserve ratio cannot be negative".to_string(),
            ));
        }
        if self.scenarios.is_empty() {
            return Err(FiscalError::Config(
                "at least one scenario is required".to_string(),
            ));
        }
        for (i, scenario) in self.scenarios.iter().enumerate() {
            if self.scenarios[..i]
                .iter()
                .any(|s| s.name.eq_ignore_ascii_case(&scenario.name))
            {
                return Err(FiscalError::Config(format!(
                    "duplicate scenario '{}'",
                    scenario.name
                )));
            }
        }
        Ok(())
    }
}

/// Project `horizon_years` forward from the base. Pure.
///
/// Fails with InvalidInput when a projected amount leaves the `Decimal` range.
pub fn project(
    base: &ProjectionBase,
    scenario: &ScenarioAssumptions,
    horizon_years: u32,
    minimum_reserve_ratio: Decimal,
) -> FiscalResult<ScenarioProjection> {
    let out_of_range = |offset: u32| {
        FiscalError::InvalidInput(format!(
            "FY{} projection under '{}' leaves the representable range in year {}",
            base.fiscal_year, scenario.name, offset
        ))
    };

    let steps = [
        Decimal::ONE.checked_add(scenario.revenue_growth),
        Decimal::ONE.checked_add(scenario.expenditure_growth),
        Decimal::ONE.checked_add(scenario.pension_growth),
    ];
    let non_pension = base.non_pension_expenditures().ok_or_else(|| out_of_range(0))?;

    let mut factors = [Decimal::ONE; 3];
    let mut balance = base.fund_balance;
    let mut years = Vec::with_capacity(horizon_years as usize);

    for offset in 1..=horizon_years {
        factors = next_factors(factors, steps).ok_or_else(|| out_of_range(offset))?;
        let year = project_year(base, non_pension, factors, balance, minimum_reserve_ratio, offset)
            .ok_or_else(|| out_of_range(offset))?;
        balance = year.ending_balance;
        years.push(year);
    }

    Ok(ScenarioProjection {
        fiscal_year_id: base.fiscal_year_id,
        base_year: base.fiscal_year,
        base_balance: base.fund_balance,
        scenario: scenario.clone(),
        minimum_reserve_ratio,
        years,
    })
}

/// Compound revenue, non-pension expenditure and pension factors one year
fn next_factors(factors: [Decimal; 3], steps: [Option<Decimal>; 3]) -> Option<[Decimal; 3]> {
    let [revenue, expenditure, pension] = factors;
    let [revenue_step, expenditure_step, pension_step] = steps;
    Some([
        revenue.checked_mul(revenue_step?)?,
        expenditure.checked_mul(expenditure_step?)?,
        pension.checked_mul(pension_step?)?,
    ])
}

fn project_year(
    base: &ProjectionBase,
    non_pension: Decimal,
    factors: [Decimal; 3],
    beginning_balance: Decimal,
    minimum_reserve_ratio: Decimal,
    offset: u32,
) -> Option<ProjectionYear> {
    let [revenue_factor, expenditure_factor, pension_factor] = factors;

    let revenues = base.revenues.checked_mul(revenue_factor)?.round_dp(2);
    let pension_contributions = base
        .pension_contributions
        .checked_mul(pension_factor)?
        .round_dp(2);
    let expenditures = non_pension
        .checked_mul(expenditure_factor)?
        .round_dp(2)
        .checked_add(pension_contributions)?;
    let operating_result = revenues.checked_sub(expenditures)?;
    let ending_balance = beginning_balance.checked_add(operating_result)?;
    let minimum_reserve = expenditures.checked_mul(minimum_reserve_ratio)?.round_dp(2);

    Some(ProjectionYear {
        year_offset: offset,
        fiscal_year: base.fiscal_year.checked_add(i32::try_from(offset).ok()?)?,
        revenues,
        expenditures,
        pension_contributions,
        operating_result,
        beginning_balance,
        ending_balance,
        minimum_reserve,
        is_deficit: operating_result.is_sign_negative() && !operating_result.is_zero(),
        is_depleting_reserves: ending_balance < beginning_balance,
        reserves_below_minimum: ending_balance < minimum_reserve,
        is_fiscal_cliff: ending_balance <= Decimal::ZERO,
    })
}

pub struct ProjectionEngine {
    store: Arc<dyn FiscalStore>,
    settings: ProjectionSettings,
}

impl ProjectionEngine {
    pub fn new(store: Arc<dyn FiscalStore>, settings: ProjectionSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ProjectionSettings {
        &self.settings
    }

    /// Base-year figures, or IncompleteData when any is missing
    pub async fn load_base(&self, fiscal_year_id: Uuid) -> FiscalResult<ProjectionBase> {
        let fiscal_year = self
            .store
            .load_fiscal_year(fiscal_year_id)
            .await?
            .ok_or_else(|| FiscalError::fiscal_year_not_found(fiscal_year_id))?;
        let facts = self.store.load_financial_facts(fiscal_year_id).await?;

        ProjectionBase::from_facts(&fiscal_year, facts.as_ref())
    }

    pub async fn project(
        &self,
        fiscal_year_id: Uuid,
        scenario_name: &str,
    ) -> FiscalResult<ScenarioProjection> {
        let scenario = find_scenario(&self.settings.scenarios, scenario_name)?;
        let base = self.load_base(fiscal_year_id).await?;
        let projection = self.run(&base, scenario)?;

        debug!(
            "Projected FY{} under '{}' for {} years, final balance {}",
            base.fiscal_year,
            scenario.name,
            projection.years.len(),
            projection.final_balance()
        );
        Ok(projection)
    }

    pub async fn fiscal_cliff(
        &self,
        fiscal_year_id: Uuid,
        scenario_name: &str,
    ) -> FiscalResult<FiscalCliffAnalysis> {
        let projection = self.project(fiscal_year_id, scenario_name).await?;
        let analysis = analyze_cliff(&projection);

        if let Some(cliff_year) = analysis.cliff_year {
            info!(
                "Fiscal cliff in FY{} under '{}' for fiscal year {}",
                cliff_year, analysis.scenario, fiscal_year_id
            );
        }
        Ok(analysis)
    }

    /// Run every configured scenario and compare outcomes year by year
    pub async fn compare(&self, fiscal_year_id: Uuid) -> FiscalResult<ScenarioComparison> {
        let base = self.load_base(fiscal_year_id).await?;
        let projections = self
            .settings
            .scenarios
            .iter()
            .map(|scenario| self.run(&base, scenario))
            .collect::<FiscalResult<Vec<_>>>()?;

        Ok(compare_scenarios(&base, projections))
    }

    fn run(
        &self,
        base: &ProjectionBase,
        scenario: &ScenarioAssumptions,
    ) -> FiscalResult<ScenarioProjection> {
        project(
            base,
            scenario,
            self.settings.horizon_years,
            self.settings.minimum_reserve_ratio,
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // -- Strategy helpers --

    fn arb_rate() -> impl Strategy<Value = Decimal> {
        (-200i64..300).prop_map(|n| Decimal::new(n, 3))
    }

    fn arb_scenario() -> impl Strategy<Value = ScenarioAssumptions> {
        (arb_rate(), arb_rate(), arb_rate())
            .prop_map(|(r, e, p)| ScenarioAssumptions::new("arbitrary", r, e, p))
    }

    fn arb_base() -> impl Strategy<Value = ProjectionBase> {
        (
            0i64..10_000_000_000,
            0i64..10_000_000_000,
            0u32..=100,
            -1_000_000_000i64..1_000_000_000,
        )
            .prop_map(|(revenues, expenditures, pension_share, balance)| {
                let expenditures = Decimal::new(expenditures, 2);
                ProjectionBase {
                    fiscal_year_id: Uuid::nil(),
                    fiscal_year: 2023,
                    revenues: Decimal::new(revenues, 2),
                    expenditures,
                    pension_contributions: (expenditures * Decimal::from(pension_share)
                        / Decimal::ONE_HUNDRED)
                        .round_dp(2),
                    fund_balance: Decimal::new(balance, 2),
                }
            })
    }

    fn arb_extreme_amount() -> impl Strategy<Value = Decimal> {
        prop_oneof![
            Just(Decimal::MAX),
            Just(Decimal::MIN),
            any::<i64>().prop_map(Decimal::from),
        ]
    }

    proptest! {
        /// Balances roll forward without gaps and the cliff flag follows the balance
        #[test]
        fn balances_chain_year_to_year(
            base in arb_base(),
            scenario in arb_scenario(),
            horizon in 1u32..=MAX_HORIZON_YEARS,
        ) {
            let projection = project(&base, &scenario, horizon, default_minimum_reserve_ratio())
                .unwrap();

            prop_assert_eq!(projection.years.len(), horizon as usize);
            let mut previous = base.fund_balance;
            for (index, year) in projection.years.iter().enumerate() {
                prop_assert_eq!(year.year_offset as usize, index + 1);
                prop_assert_eq!(year.fiscal_year, base.fiscal_year + index as i32 + 1);
                prop_assert_eq!(year.beginning_balance, previous);
                prop_assert_eq!(year.ending_balance, year.beginning_balance + year.operating_result);
                prop_assert_eq!(year.operating_result, year.revenues - year.expenditures);
                prop_assert_eq!(year.is_fiscal_cliff, year.ending_balance <= Decimal::ZERO);
                previous = year.ending_balance;
            }
        }

        /// Extreme inputs are rejected as invalid, never a panic
        #[test]
        fn extreme_inputs_never_panic(
            revenues in arb_extreme_amount(),
            expenditures in arb_extreme_amount(),
            balance in arb_extreme_amount(),
            scenario in arb_scenario(),
        ) {
            let base = ProjectionBase {
                fiscal_year_id: Uuid::nil(),
                fiscal_year: 2023,
                revenues,
                expenditures,
                pension_contributions: Decimal::ZERO,
                fund_balance: balance,
            };

            match project(&base, &scenario, 5, default_minimum_reserve_ratio()) {
                Ok(projection) => prop_assert_eq!(projection.years.len(), 5),
                Err(e) => prop_assert!(matches!(e, FiscalError::InvalidInput(_))),
            }
        }
    }
}
