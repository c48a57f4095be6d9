//! Risk score value objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::indicators::{Category, ThresholdBucket};

/// Risk classification derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl RiskLevel {
    /// Pure function of the overall score; lower bounds are inclusive
    /// (exactly 25.0 is moderate, 50.0 high, 75.0 severe).
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            Self::Low
        } else if score < 50.0 {
            Self::Moderate
        } else if score < 75.0 {
            Self::High
        } else {
            Self::Severe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Severe => "severe",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "indicates a stable fiscal position with manageable risks",
            Self::Moderate => "indicates emerging fiscal pressures that warrant monitoring",
            Self::High => "indicates significant fiscal stress that requires corrective action",
            Self::Severe => "indicates severe fiscal distress that requires immediate intervention",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "severe" => Ok(Self::Severe),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

/// The five category sub-scores, each 0-100
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub liquidity: f64,
    pub structural: f64,
    pub pension: f64,
    pub revenue: f64,
    pub debt: f64,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Liquidity => self.liquidity,
            Category::Structural => self.structural,
            Category::Pension => self.pension,
            Category::Revenue => self.revenue,
            Category::Debt => self.debt,
        }
    }

    pub fn set(&mut self, category: Category, score: f64) {
        match category {
            Category::Liquidity => self.liquidity = score,
            Category::Structural => self.structural = score,
            Category::Pension => self.pension = score,
            Category::Revenue => self.revenue = score,
            Category::Debt => self.debt = score,
        }
    }

    /// Highest-scoring category; ties go to the earlier category
    pub fn worst(&self) -> (Category, f64) {
        let mut worst = (Category::ALL[0], self.get(Category::ALL[0]));
        for category in Category::ALL.into_iter().skip(1) {
            let score = self.get(category);
            if score > worst.1 {
                worst = (category, score);
            }
        }
        worst
    }

    /// Σ(category score × category weight)
    pub fn weighted_total(&self) -> f64 {
        Category::ALL
            .iter()
            .map(|c| self.get(*c) * c.weight())
            .sum()
    }
}

/// One ranked entry in a risk score's top risk factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub indicator_code: String,
    pub indicator_name: String,
    pub score: f64,
    pub value: f64,
    pub threshold_category: ThresholdBucket,
    pub interpretation: String,
}

/// Per-indicator child record of a risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScore {
    pub id: Uuid,
    pub risk_score_id: Uuid,
    pub fiscal_year_id: Uuid,
    pub indicator_code: String,
    pub value: f64,
    pub score: f64,
    pub threshold_category: ThresholdBucket,
    /// Weight within the overall score (category weight split equally)
    pub weight: f64,
    /// score × weight
    pub contribution: f64,
}

/// Composite fiscal stress score for one fiscal year at one point in time.
///
/// Never mutated after creation apart from the human validation marker; a
/// recalculation produces a new score with new indicator children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub id: Uuid,
    pub fiscal_year_id: Uuid,
    pub model_version: String,
    pub calculated_at: DateTime<Utc>,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub category_scores: CategoryScores,
    pub data_completeness_percent: f64,
    pub indicators_available: u32,
    pub indicators_missing: u32,
    pub top_risk_factors: Vec<RiskFactor>,
    pub narrative: String,
    pub validated: bool,
    pub validated_by: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub indicator_scores: Vec<IndicatorScore>,
}

impl RiskScore {
    pub fn total_indicators(&self) -> u32 {
        self.indicators_available + self.indicators_missing
    }
}
