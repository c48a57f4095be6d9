//! Fiscal cliff analysis and scenario comparison

use rust_decimal::{Decimal, RoundingStrategy};

use super::model::{
    ComparisonYear, FiscalCliffAnalysis, ProjectionBase, ProjectionYear, ScenarioComparison,
    ScenarioProjection,
};

/// Summarise reserve exhaustion for one projection.
///
/// When a cliff exists, the sensitivity figures invert the same model: the
/// smallest uniform percentage change, in hundredths of a percent, that
/// keeps every cumulative balance above zero.
pub fn analyze_cliff(projection: &ScenarioProjection) -> FiscalCliffAnalysis {
    let cliff = projection.cliff_year();
    let has_cliff = cliff.is_some();

    let (revenue_increase, expenditure_decrease) = if has_cliff {
        (
            required_change(projection.base_balance, &projection.years, |y| y.revenues),
            required_change(projection.base_balance, &projection.years, |y| {
                y.expenditures
            }),
        )
    } else {
        (None, None)
    };

    let mut analysis = FiscalCliffAnalysis {
        fiscal_year_id: projection.fiscal_year_id,
        scenario: projection.scenario_name().to_string(),
        base_year: projection.base_year,
        horizon_years: projection.years.len() as u32,
        has_cliff,
        cliff_year: cliff.map(|y| y.fiscal_year),
        years_until_cliff: cliff.map(|y| y.year_offset),
        cliff_balance: cliff.map(|y| y.ending_balance),
        first_deficit_year: projection.first_deficit_year(),
        first_below_minimum_year: projection.first_below_minimum_year(),
        revenue_increase_needed_percent: revenue_increase,
        expenditure_decrease_needed_percent: expenditure_decrease,
        summary: String::new(),
    };
    analysis.summary = cliff_summary(&analysis, projection);
    analysis
}

/// Largest shortfall over the horizon relative to the cumulative value of
/// the lever (revenues or expenditures) up to that year.
///
/// A year ending at exactly zero is still a cliff, so the result is the
/// smallest hundredth of a percent strictly above the exact requirement.
/// None when no year can be rescued by the lever or the sums overflow.
fn required_change(
    base_balance: Decimal,
    years: &[ProjectionYear],
    lever: impl Fn(&ProjectionYear) -> Decimal,
) -> Option<Decimal> {
    let mut cumulative_lever = Decimal::ZERO;
    let mut cumulative_result = Decimal::ZERO;
    let mut needed: Option<Decimal> = None;

    for year in years {
        cumulative_lever = cumulative_lever.checked_add(lever(year))?;
        cumulative_result = cumulative_result.checked_add(year.operating_result)?;
        let balance = base_balance.checked_add(cumulative_result)?;

        if balance > Decimal::ZERO || cumulative_lever <= Decimal::ZERO {
            continue;
        }
        let ratio = balance.abs().checked_div(cumulative_lever)?;
        needed = Some(needed.map_or(ratio, |n| n.max(ratio)));
    }

    let percent = needed?.checked_mul(Decimal::ONE_HUNDRED)?;
    percent
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
        .checked_add(Decimal::new(1, 2))
}

fn cliff_summary(analysis: &FiscalCliffAnalysis, projection: &ScenarioProjection) -> String {
    let horizon_end = projection
        .years
        .last()
        .map(|y| y.fiscal_year)
        .unwrap_or(projection.base_year);

    match (analysis.cliff_year, analysis.years_until_cliff) {
        (Some(year), Some(offset)) => {
            let mut summary = format!(
                "Under the {} scenario reserves are exhausted in FY{}, {} year{} after FY{}.",
                analysis.scenario,
                year,
                offset,
                if offset == 1 { "" } else { "s" },
                analysis.base_year
            );
            if let (Some(revenue), Some(expenditure)) = (
                analysis.revenue_increase_needed_percent,
                analysis.expenditure_decrease_needed_percent,
            ) {
                summary.push_str(&format!(
                    " Avoiding it through FY{} requires a {}% revenue increase or a {}% expenditure reduction.",
                    horizon_end, revenue, expenditure
                ));
            }
            summary
        }
        _ => format!(
            "Under the {} scenario reserves remain positive through FY{}.",
            analysis.scenario, horizon_end
        ),
    }
}

/// Compare projections year by year. Ties go to the scenario listed first.
pub fn compare_scenarios(
    base: &ProjectionBase,
    projections: Vec<ScenarioProjection>,
) -> ScenarioComparison {
    let horizon = projections
        .iter()
        .map(|p| p.years.len())
        .min()
        .unwrap_or(0);

    let mut years = Vec::with_capacity(horizon);
    for index in 0..horizon {
        let mut outcomes = projections
            .iter()
            .map(|p| (p.scenario_name(), &p.years[index]));

        let Some((first_name, first_year)) = outcomes.next() else {
            break;
        };
        let mut best = (first_name, first_year.ending_balance);
        let mut worst = best;
        for (name, year) in outcomes {
            if year.ending_balance > best.1 {
                best = (name, year.ending_balance);
            }
            if year.ending_balance < worst.1 {
                worst = (name, year.ending_balance);
            }
        }

        years.push(ComparisonYear {
            fiscal_year: first_year.fiscal_year,
            best_scenario: best.0.to_string(),
            best_balance: best.1,
            worst_scenario: worst.0.to_string(),
            worst_balance: worst.1,
            spread: best.1.saturating_sub(worst.1),
        });
    }

    let cliffs = projections.iter().map(analyze_cliff).collect();

    ScenarioComparison {
        fiscal_year_id: base.fiscal_year_id,
        base_year: base.fiscal_year,
        projections,
        cliffs,
        years,
    }
}
