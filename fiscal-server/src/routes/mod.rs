//! HTTP routes
//!
//! Handlers return `Result<Json<T>, (StatusCode, String)>`; every core error
//! goes through [`error_response`].

use axum::{http::StatusCode, response::Json, routing::get, Router};
use fiscal_core::FiscalError;
use serde_json::json;
use tracing::{debug, error};

use crate::state::AppState;

pub mod projection_routes;
pub mod risk_routes;
pub mod validation_routes;

pub type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Map a core error onto an HTTP status and message
pub fn error_response(err: FiscalError) -> (StatusCode, String) {
    let status = match &err {
        _ if !err.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
        FiscalError::NotFound { .. } => StatusCode::NOT_FOUND,
        FiscalError::IncompleteData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };

    if status.is_server_error() {
        error!("Request failed: {:#}", err);
    } else {
        debug!("Request rejected ({}): {}", status, err);
    }
    (status, err.to_string())
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "fiscal-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Create the router for every fiscal endpoint
pub fn create_fiscal_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(risk_routes::create_risk_router())
        .merge(projection_routes::create_projection_router())
        .merge(validation_routes::create_validation_router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                FiscalError::NotFound {
                    entity: "Queue item",
                    id: "x".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                FiscalError::InvalidAction("PURGE".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                FiscalError::InvalidTransition {
                    from: "FLAGGED".to_string(),
                    to: "PUBLISHED".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                FiscalError::IncompleteData {
                    fiscal_year: 2023,
                    missing: vec!["revenues"],
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FiscalError::InvalidInput("validated_by is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                FiscalError::Store(anyhow::anyhow!("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                FiscalError::Config("bad horizon".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let caller_fault = err.is_client_error();
            let status = error_response(err).0;
            assert_eq!(status, expected);
            assert_eq!(status.is_client_error(), caller_fault);
        }
    }
}
