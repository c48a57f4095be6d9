//! Shared application state

use std::sync::Arc;

use fiscal_core::store::FiscalStore;
use fiscal_core::{
    AnomalyDetector, FiscalConfig, FiscalResult, ProjectionEngine, RiskScoringEngine,
    ValidationWorkflow,
};

/// Engines wired to one store, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FiscalStore>,
    pub scoring: Arc<RiskScoringEngine>,
    pub detector: Arc<AnomalyDetector>,
    pub workflow: Arc<ValidationWorkflow>,
    pub projections: Arc<ProjectionEngine>,
    pub model_version: String,
}

impl AppState {
    pub fn new(store: Arc<dyn FiscalStore>, config: &FiscalConfig) -> FiscalResult<Self> {
        Ok(Self {
            scoring: Arc::new(RiskScoringEngine::new(
                store.clone(),
                config.indicator_catalog()?,
            )),
            detector: Arc::new(AnomalyDetector::new(store.clone())),
            workflow: Arc::new(ValidationWorkflow::new(store.clone())),
            projections: Arc::new(ProjectionEngine::new(
                store.clone(),
                config.projection_settings(),
            )),
            model_version: config.model_version.clone(),
            store,
        })
    }
}
