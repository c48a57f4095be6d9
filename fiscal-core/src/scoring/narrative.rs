//! Narrative summary
//!
//! Plain-text paragraphs assembled from fixed templates. Identical inputs
//! always produce byte-identical output.

use std::fmt::Write;

use super::model::{CategoryScores, RiskFactor, RiskLevel};

/// Maximum risk factors named in the narrative
pub const NARRATIVE_FACTOR_LIMIT: usize = 3;

pub fn generate_narrative(
    fiscal_year: i32,
    overall_score: f64,
    risk_level: RiskLevel,
    category_scores: &CategoryScores,
    top_risk_factors: &[RiskFactor],
) -> String {
    let mut text = String::new();

    let _ = write!(
        text,
        "The FY{} fiscal stress score is {:.2} out of 100, a {} risk rating. This rating {}.",
        fiscal_year,
        overall_score,
        risk_level,
        risk_level.description()
    );

    let (worst, worst_score) = category_scores.worst();
    let _ = write!(
        text,
        "\n\nThe primary concern is {}, which scored {:.1}.",
        worst.label(),
        worst_score
    );

    if top_risk_factors.is_empty() {
        text.push_str("\n\nNo indicators were available to rank individual risk factors.");
    } else {
        text.push_str("\n\nKey risk factors:");
        for factor in top_risk_factors.iter().take(NARRATIVE_FACTOR_LIMIT) {
            let _ = write!(
                text,
                "\n- {} (score {:.1}): {}",
                factor.indicator_name, factor.score, factor.interpretation
            );
        }
    }

    text
}
