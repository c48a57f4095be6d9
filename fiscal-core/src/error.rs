//! Error types for the fiscal core
//!
//! Structural failures (missing entities, bad input) surface to the caller as
//! typed errors. Computational gaps such as missing indicators degrade the
//! result instead and never appear here.

use thiserror::Error;
use uuid::Uuid;

/// Result alias used by every engine in this crate
pub type FiscalResult<T> = Result<T, FiscalError>;

/// Main error type for the fiscal core
#[derive(Error, Debug)]
pub enum FiscalError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid validation action '{0}'")]
    InvalidAction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot move queue item from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Fiscal year {fiscal_year} is missing required data: {}", missing.join(", "))]
    IncompleteData {
        fiscal_year: i32,
        missing: Vec<&'static str>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl FiscalError {
    pub fn fiscal_year_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Fiscal year",
            id: id.to_string(),
        }
    }

    pub fn queue_item_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Queue item",
            id: id.to_string(),
        }
    }

    pub fn risk_score_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Risk score",
            id: id.to_string(),
        }
    }

    pub fn scenario_not_found(name: &str) -> Self {
        Self::NotFound {
            entity: "Scenario",
            id: name.to_string(),
        }
    }

    /// True for errors caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidAction(_)
                | Self::InvalidInput(_)
                | Self::InvalidTransition { .. }
                | Self::IncompleteData { .. }
        )
    }
}

impl From<serde_yaml::Error> for FiscalError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_data_message_lists_fields() {
        let err = FiscalError::IncompleteData {
            fiscal_year: 2023,
            missing: vec!["total_revenues", "pension_contributions"],
        };
        assert_eq!(
            err.to_string(),
            "Fiscal year 2023 is missing required data: total_revenues, pension_contributions"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_errors_are_not_client_errors() {
        let err = FiscalError::from(anyhow::anyhow!("connection reset"));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Store error: connection reset");
    }
}
