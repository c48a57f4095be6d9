//! Risk Scoring Engine
//!
//! Aggregates indicator sub-scores into five equal-weighted category averages
//! and one weighted overall score, classifies the risk level, ranks the top
//! risk factors and writes the narrative. Missing data degrades the score
//! (neutral categories, lower completeness); it never fails the calculation.
//!
//! Calculation and persistence are two explicit phases: [`score_indicators`]
//! builds the complete in-memory aggregate, then the store writes the root
//! and its indicator children as one unit.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{CategoryScores, IndicatorScore, RiskFactor, RiskLevel, RiskScore};
use super::narrative::generate_narrative;
use crate::error::{FiscalError, FiscalResult};
use crate::indicators::{Category, IndicatorCalculator, IndicatorCatalog, IndicatorResult};
use crate::store::FiscalStore;
use crate::types::{FinancialFacts, FiscalYear};

/// Score given to a category with no available indicators
pub const NEUTRAL_CATEGORY_SCORE: f64 = 50.0;

/// Number of ranked risk factors kept on a score
pub const TOP_RISK_FACTOR_LIMIT: usize = 5;

pub struct RiskScoringEngine {
    store: Arc<dyn FiscalStore>,
    calculator: IndicatorCalculator,
}

impl RiskScoringEngine {
    pub fn new(store: Arc<dyn FiscalStore>, catalog: Arc<IndicatorCatalog>) -> Self {
        Self {
            store,
            calculator: IndicatorCalculator::new(catalog),
        }
    }

    /// Compute an uncommitted risk score for a fiscal year.
    ///
    /// Fails only when the fiscal year does not exist or the store fails.
    pub async fn calculate_risk_score(
        &self,
        fiscal_year_id: Uuid,
        model_version: &str,
    ) -> FiscalResult<RiskScore> {
        let fiscal_year = self
            .store
            .load_fiscal_year(fiscal_year_id)
            .await?
            .ok_or_else(|| FiscalError::fiscal_year_not_found(fiscal_year_id))?;

        let current = self
            .store
            .load_financial_facts(fiscal_year.id)
            .await?
            .unwrap_or_else(|| FinancialFacts::new(fiscal_year.id));

        let prior_year = match fiscal_year.year.checked_sub(1) {
            Some(year) => self.store.find_fiscal_year(fiscal_year.city_id, year).await?,
            None => None,
        };
        let prior = match prior_year {
            Some(prior_year) => self.store.load_financial_facts(prior_year.id).await?,
            None => None,
        };

        let results = self.calculator.calculate(&current, prior.as_ref());
        Ok(score_indicators(
            &fiscal_year,
            &results,
            self.calculator.catalog(),
            model_version,
        ))
    }

    /// Calculate, then persist the score and its indicator children together
    pub async fn calculate_and_store(
        &self,
        fiscal_year_id: Uuid,
        model_version: &str,
    ) -> FiscalResult<RiskScore> {
        let score = self
            .calculate_risk_score(fiscal_year_id, model_version)
            .await?;
        self.store.save_risk_score(&score).await?;

        info!(
            "Stored risk score {} for fiscal year {}: {:.2} ({})",
            score.id, fiscal_year_id, score.overall_score, score.risk_level
        );

        Ok(score)
    }

    /// The canonical (most recent) score for a fiscal year
    pub async fn latest(&self, fiscal_year_id: Uuid) -> FiscalResult<Option<RiskScore>> {
        Ok(self.store.latest_risk_score(fiscal_year_id).await?)
    }

    /// Recalculation history, newest first
    pub async fn history(&self, fiscal_year_id: Uuid) -> FiscalResult<Vec<RiskScore>> {
        Ok(self.store.risk_score_history(fiscal_year_id).await?)
    }

    /// Record a human sign-off on a stored score
    pub async fn mark_validated(&self, risk_score_id: Uuid, by: &str) -> FiscalResult<RiskScore> {
        if !self
            .store
            .mark_risk_score_validated(risk_score_id, by, Utc::now())
            .await?
        {
            return Err(FiscalError::risk_score_not_found(risk_score_id));
        }
        info!("Risk score {} validated by {}", risk_score_id, by);

        self.store
            .load_risk_score(risk_score_id)
            .await?
            .ok_or_else(|| FiscalError::risk_score_not_found(risk_score_id))
    }
}

/// Build a complete risk score from indicator results. Pure apart from the
/// generated id and timestamp.
pub fn score_indicators(
    fiscal_year: &FiscalYear,
    results: &[IndicatorResult],
    catalog: &IndicatorCatalog,
    model_version: &str,
) -> RiskScore {
    let category_scores = category_scores(results);
    let overall_score = overall_score(&category_scores);
    let risk_level = RiskLevel::from_score(overall_score);

    let total = catalog.len() as u32;
    let available = results.iter().filter(|r| r.available).count() as u32;
    let completeness = data_completeness(available, total);

    let top_risk_factors = top_risk_factors(results);
    let narrative = generate_narrative(
        fiscal_year.year,
        overall_score,
        risk_level,
        &category_scores,
        &top_risk_factors,
    );

    let id = Uuid::new_v4();
    let indicator_scores = indicator_scores(id, fiscal_year.id, results, catalog);

    debug!(
        "Scored fiscal year {}: overall {:.2}, {}/{} indicators available",
        fiscal_year.year, overall_score, available, total
    );

    RiskScore {
        id,
        fiscal_year_id: fiscal_year.id,
        model_version: model_version.to_string(),
        calculated_at: Utc::now(),
        overall_score,
        risk_level,
        category_scores,
        data_completeness_percent: completeness,
        indicators_available: available,
        indicators_missing: total.saturating_sub(available),
        top_risk_factors,
        narrative,
        validated: false,
        validated_by: None,
        validated_at: None,
        indicator_scores,
    }
}

/// Mean indicator score per category; neutral 50.0 when none are available
pub fn category_scores(results: &[IndicatorResult]) -> CategoryScores {
    let mut scores = CategoryScores::default();
    for category in Category::ALL {
        let available: Vec<f64> = results
            .iter()
            .filter(|r| r.available && r.category == category)
            .filter_map(|r| r.score)
            .collect();

        let score = if available.is_empty() {
            warn!(
                "No indicators available for category '{}', using neutral score {}",
                category, NEUTRAL_CATEGORY_SCORE
            );
            NEUTRAL_CATEGORY_SCORE
        } else {
            available.iter().sum::<f64>() / available.len() as f64
        };
        scores.set(category, score);
    }
    scores
}

/// Σ(category score × weight), rounded to 2 decimals
pub fn overall_score(category_scores: &CategoryScores) -> f64 {
    round2(category_scores.weighted_total()).clamp(0.0, 100.0)
}

pub fn data_completeness(available: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(available) / f64::from(total) * 100.0
}

/// Available, scored indicators ranked by score descending, at most five.
/// Ties keep catalog order.
pub fn top_risk_factors(results: &[IndicatorResult]) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = results
        .iter()
        .filter(|r| r.available)
        .filter_map(|r| {
            Some(RiskFactor {
                indicator_code: r.code.clone(),
                indicator_name: r.indicator_name.clone(),
                score: r.score?,
                value: r.value?,
                threshold_category: r.threshold_category?,
                interpretation: r.interpretation.clone().unwrap_or_default(),
            })
        })
        .collect();

    factors.sort_by(|a, b| b.score.total_cmp(&a.score));
    factors.truncate(TOP_RISK_FACTOR_LIMIT);
    factors
}

/// One child record per available indicator; unavailable ones are skipped
fn indicator_scores(
    risk_score_id: Uuid,
    fiscal_year_id: Uuid,
    results: &[IndicatorResult],
    catalog: &IndicatorCatalog,
) -> Vec<IndicatorScore> {
    results
        .iter()
        .filter(|r| r.available)
        .filter_map(|r| {
            let score = r.score?;
            let weight = catalog.weight_within_category(r.category);
            Some(IndicatorScore {
                id: Uuid::new_v4(),
                risk_score_id,
                fiscal_year_id,
                indicator_code: r.code.clone(),
                value: r.value?,
                score,
                threshold_category: r.threshold_category?,
                weight,
                contribution: score * weight,
            })
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
