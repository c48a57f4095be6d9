//! Multi-year reserve projections and fiscal cliff detection

pub mod cliff;
pub mod engine;
pub mod model;
pub mod scenario;

pub use cliff::{analyze_cliff, compare_scenarios};
pub use engine::{
    default_minimum_reserve_ratio, project, ProjectionEngine, ProjectionSettings,
    DEFAULT_HORIZON_YEARS, MAX_HORIZON_YEARS,
};
pub use model::{
    ComparisonYear, FiscalCliffAnalysis, ProjectionBase, ProjectionYear, ScenarioComparison,
    ScenarioProjection,
};
pub use scenario::{find_scenario, ScenarioAssumptions};
