//! Risk score routes
//!
//! POST /api/fiscal-years/:id/risk-score          - calculate and store
//! GET  /api/fiscal-years/:id/risk-score          - latest stored score
//! GET  /api/fiscal-years/:id/risk-score/history  - every score, newest first
//! POST /api/risk-scores/:id/validate             - analyst sign-off

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use fiscal_core::{FiscalError, FiscalStore, RiskScore};
use serde::Deserialize;
use uuid::Uuid;

use super::{error_response, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateScoreRequest {
    pub validated_by: String,
}

pub fn create_risk_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/fiscal-years/:id/risk-score",
            post(calculate_risk_score).get(latest_risk_score),
        )
        .route(
            "/api/fiscal-years/:id/risk-score/history",
            get(risk_score_history),
        )
        .route("/api/risk-scores/:id/validate", post(validate_risk_score))
}

/// Scoring requires revenue and expenditure entry to be complete
async fn calculate_risk_score(
    State(state): State<AppState>,
    Path(fiscal_year_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RiskScore>), (StatusCode, String)> {
    let fiscal_year = state
        .store
        .load_fiscal_year(fiscal_year_id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(FiscalError::fiscal_year_not_found(fiscal_year_id)))?;

    let missing = fiscal_year.missing_for_scoring();
    if !missing.is_empty() {
        return Err(error_response(FiscalError::IncompleteData {
            fiscal_year: fiscal_year.year,
            missing,
        }));
    }

    let score = state
        .scoring
        .calculate_and_store(fiscal_year_id, &state.model_version)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(score)))
}

async fn latest_risk_score(
    State(state): State<AppState>,
    Path(fiscal_year_id): Path<Uuid>,
) -> ApiResult<RiskScore> {
    state
        .scoring
        .latest(fiscal_year_id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| {
            error_response(FiscalError::NotFound {
                entity: "Risk score for fiscal year",
                id: fiscal_year_id.to_string(),
            })
        })
}

async fn risk_score_history(
    State(state): State<AppState>,
    Path(fiscal_year_id): Path<Uuid>,
) -> ApiResult<Vec<RiskScore>> {
    let history = state
        .scoring
        .history(fiscal_year_id)
        .await
        .map_err(error_response)?;
    Ok(Json(history))
}

async fn validate_risk_score(
    State(state): State<AppState>,
    Path(risk_score_id): Path<Uuid>,
    Json(request): Json<ValidateScoreRequest>,
) -> ApiResult<RiskScore> {
    if request.validated_by.trim().is_empty() {
        return Err(error_response(FiscalError::InvalidInput(
            "validated_by is required".to_string(),
        )));
    }

    let score = state
        .scoring
        .mark_validated(risk_score_id, &request.validated_by)
        .await
        .map_err(error_response)?;
    Ok(Json(score))
}
