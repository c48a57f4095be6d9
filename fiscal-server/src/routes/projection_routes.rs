//! Projection routes
//!
//! GET /api/scenarios                                   - configured scenarios
//! GET /api/fiscal-years/:id/projections/:scenario      - year-by-year projection
//! GET /api/fiscal-years/:id/fiscal-cliff?scenario=base - cliff analysis
//! GET /api/fiscal-years/:id/scenarios/compare          - all scenarios side by side

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use fiscal_core::projection::scenario::BASE;
use fiscal_core::{
    FiscalCliffAnalysis, ScenarioAssumptions, ScenarioComparison, ScenarioProjection,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{error_response, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CliffQuery {
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

fn default_scenario() -> String {
    BASE.to_string()
}

pub fn create_projection_router() -> Router<AppState> {
    Router::new()
        .route("/api/scenarios", get(list_scenarios))
        .route(
            "/api/fiscal-years/:id/projections/:scenario",
            get(project_scenario),
        )
        .route("/api/fiscal-years/:id/fiscal-cliff", get(fiscal_cliff))
        .route(
            "/api/fiscal-years/:id/scenarios/compare",
            get(compare_scenarios),
        )
}

async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioAssumptions>> {
    Json(state.projections.settings().scenarios.clone())
}

async fn project_scenario(
    State(state): State<AppState>,
    Path((fiscal_year_id, scenario)): Path<(Uuid, String)>,
) -> ApiResult<ScenarioProjection> {
    let projection = state
        .projections
        .project(fiscal_year_id, &scenario)
        .await
        .map_err(error_response)?;
    Ok(Json(projection))
}

async fn fiscal_cliff(
    State(state): State<AppState>,
    Path(fiscal_year_id): Path<Uuid>,
    Query(query): Query<CliffQuery>,
) -> ApiResult<FiscalCliffAnalysis> {
    let analysis = state
        .projections
        .fiscal_cliff(fiscal_year_id, &query.scenario)
        .await
        .map_err(error_response)?;
    Ok(Json(analysis))
}

async fn compare_scenarios(
    State(state): State<AppState>,
    Path(fiscal_year_id): Path<Uuid>,
) -> ApiResult<ScenarioComparison> {
    let comparison = state
        .projections
        .compare(fiscal_year_id)
        .await
        .map_err(error_response)?;
    Ok(Json(comparison))
}
