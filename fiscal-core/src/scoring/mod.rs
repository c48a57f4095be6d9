//! Composite fiscal stress scoring

pub mod engine;
pub mod model;
pub mod narrative;

pub use engine::{
    category_scores, overall_score, score_indicators, top_risk_factors, RiskScoringEngine,
    NEUTRAL_CATEGORY_SCORE, TOP_RISK_FACTOR_LIMIT,
};
pub use model::{CategoryScores, IndicatorScore, RiskFactor, RiskLevel, RiskScore};
pub use narrative::generate_narrative;
