//! Engine configuration
//!
//! Defines the serde schema for `config/fiscal.yaml`. Every field has a
//! default, so an empty document yields the reference configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{FiscalError, FiscalResult};
use crate::indicators::{IndicatorCatalog, IndicatorDefinition};
use crate::projection::{
    default_minimum_reserve_ratio, ProjectionSettings, ScenarioAssumptions,
    DEFAULT_HORIZON_YEARS,
};

pub const DEFAULT_MODEL_VERSION: &str = "v1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalConfig {
    /// Stamped on every risk score
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Projected years per scenario
    #[serde(default = "default_horizon")]
    pub horizon_years: u32,

    /// Fraction of a year's expenditures the ending balance should cover
    #[serde(default = "default_minimum_reserve_ratio")]
    pub minimum_reserve_ratio: Decimal,

    #[serde(default = "ScenarioAssumptions::canonical")]
    pub scenarios: Vec<ScenarioAssumptions>,

    /// Replaces the reference indicator catalog when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicators: Option<Vec<IndicatorDefinition>>,
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_YEARS
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            model_version: default_model_version(),
            horizon_years: default_horizon(),
            minimum_reserve_ratio: default_minimum_reserve_ratio(),
            scenarios: ScenarioAssumptions::canonical(),
            indicators: None,
        }
    }
}

impl FiscalConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> FiscalResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FiscalError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml_str(&content)?;

        tracing::info!(
            "Loaded fiscal config from {:?} (model {}, {} scenarios)",
            path,
            config.model_version,
            config.scenarios.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> FiscalResult<Self> {
        let config: FiscalConfig = if yaml.trim().is_empty() {
            FiscalConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.projection_settings().validate()?;
        config.indicator_catalog()?;
        Ok(config)
    }

    /// The configured indicator catalog, or the shared reference catalog
    pub fn indicator_catalog(&self) -> FiscalResult<Arc<IndicatorCatalog>> {
        match &self.indicators {
            Some(definitions) => Ok(Arc::new(IndicatorCatalog::new(definitions.clone())?)),
            None => Ok(IndicatorCatalog::reference()),
        }
    }

    pub fn projection_settings(&self) -> ProjectionSettings {
        ProjectionSettings {
            horizon_years: self.horizon_years,
            minimum_reserve_ratio: self.minimum_reserve_ratio,
            scenarios: self.scenarios.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = FiscalConfig::from_yaml_str("").unwrap();
        assert_eq!(config, FiscalConfig::default());
        assert_eq!(config.horizon_years, 5);
        assert_eq!(config.minimum_reserve_ratio, Decimal::new(167, 3));
        assert_eq!(config.scenarios.len(), 3);
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
model_version: "v2.0-pilot"
horizon_years: 10
scenarios:
  - name: recession
    revenue_growth: "-0.02"
    expenditure_growth: "0.03"
    pension_growth: "0.09"
"#;
        let config = FiscalConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.model_version, "v2.0-pilot");
        assert_eq!(config.horizon_years, 10);
        assert_eq!(config.minimum_reserve_ratio, Decimal::new(167, 3)); // default
        assert_eq!(config.scenarios.len(), 1);
        assert_eq!(config.scenarios[0].revenue_growth, Decimal::new(-2, 2));
    }

    #[test]
    fn test_invalid_horizon_rejected() {
        let err = FiscalConfig::from_yaml_str("horizon_years: 0").unwrap_err();
        assert!(matches!(err, FiscalError::Config(_)));
    }

    #[test]
    fn test_custom_indicator_catalog() {
        let mut config = FiscalConfig::default();
        assert_eq!(config.indicator_catalog().unwrap().len(), 9);

        let definitions: Vec<_> = IndicatorCatalog::reference()
            .iter()
            .filter(|d| d.code != crate::indicators::codes::DAYS_CASH_ON_HAND)
            .cloned()
            .collect();
        config.indicators = Some(definitions);
        let catalog = config.indicator_catalog().unwrap();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.get(crate::indicators::codes::DAYS_CASH_ON_HAND).is_none());
    }

    #[test]
    fn test_invalid_indicator_catalog_rejected() {
        let yaml = r#"
indicators:
  - code: fund_balance_ratio
    name: Fund Balance Ratio
    category: liquidity
    thresholds: { healthy: 5.0, adequate: 10.0, warning: 15.0, critical: 20.0 }
    higher_is_better: true
    unit: "%"
"#;
        let err = FiscalConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, FiscalError::Config(_)));
        assert!(err.to_string().contains("not ordered"));
    }
}
