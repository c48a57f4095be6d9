//! fiscal-core: municipal fiscal stress scoring and data validation
//!
//! This crate holds the computational core with storage behind a trait:
//! - Indicator catalog and calculator (nine ratios in five categories)
//! - Risk scoring engine with deterministic narrative
//! - Rule-driven anomaly detector and the validation review workflow
//! - Scenario projections and fiscal cliff analysis
//!
//! # Data flow
//!
//! ```text
//! entered value ──► AnomalyDetector ──► QueueItem ──► ValidationWorkflow
//!                                                          │
//!                                   approved facts ◄───────┘
//!                                         │
//!                ┌────────────────────────┴─────────────────┐
//!                ▼                                          ▼
//!     IndicatorCalculator ──► RiskScoringEngine     ProjectionEngine
//!                                   │                       │
//!                               RiskScore          FiscalCliffAnalysis
//! ```
//!
//! Enable the `postgres` feature for the sqlx-backed store; the in-memory
//! store is always available.

pub mod config;
pub mod error;
pub mod indicators;
pub mod projection;
pub mod scoring;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::FiscalConfig;
pub use error::{FiscalError, FiscalResult};
pub use indicators::{Category, IndicatorCalculator, IndicatorCatalog, IndicatorResult};
pub use projection::{
    FiscalCliffAnalysis, ProjectionEngine, ProjectionSettings, ScenarioAssumptions,
    ScenarioComparison, ScenarioProjection,
};
pub use scoring::{RiskLevel, RiskScore, RiskScoringEngine};
pub use store::{FiscalStore, MemoryStore};
pub use types::{DataLineage, FinancialFacts, FiscalYear, LineItem};
pub use validation::{
    AnomalyDetector, EnteredValue, QueueFilter, QueueItem, QueueStatus, Severity,
    ValidationRequest, ValidationWorkflow,
};
