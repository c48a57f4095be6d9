//! Validation queue routes
//!
//! POST   /api/validation/check                  - run anomaly rules on an entered value
//! GET    /api/validation/queue                  - list, filtered by status/severity/city/year
//! GET    /api/validation/summary                - counts by status and severity
//! GET    /api/validation/queue/:id              - item with flags and audit trail
//! DELETE /api/validation/queue/:id              - soft delete
//! POST   /api/validation/queue/:id/actions      - APPROVE / CORRECT / REJECT / ESCALATE
//! POST   /api/validation/queue/:id/publish      - publish an approved or corrected value

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use fiscal_core::validation::{QueueItemDetail, QueueSummary, ValidationOutcome};
use fiscal_core::{EnteredValue, FiscalError, QueueFilter, QueueItem, ValidationRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error_response, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub flagged: bool,
    pub queue_item: Option<QueueItem>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published_by: String,
}

pub fn create_validation_router() -> Router<AppState> {
    Router::new()
        .route("/api/validation/check", post(check_value))
        .route("/api/validation/queue", get(list_queue))
        .route("/api/validation/summary", get(queue_summary))
        .route(
            "/api/validation/queue/:id",
            get(queue_item_detail).delete(delete_queue_item),
        )
        .route("/api/validation/queue/:id/actions", post(apply_action))
        .route("/api/validation/queue/:id/publish", post(publish_queue_item))
}

async fn check_value(
    State(state): State<AppState>,
    Json(entry): Json<EnteredValue>,
) -> ApiResult<CheckResponse> {
    let queue_item = state
        .detector
        .check_value(&entry)
        .await
        .map_err(error_response)?;
    Ok(Json(CheckResponse {
        flagged: queue_item.is_some(),
        queue_item,
    }))
}

async fn list_queue(
    State(state): State<AppState>,
    Query(filter): Query<QueueFilter>,
) -> ApiResult<Vec<QueueItem>> {
    let items = state.workflow.queue(&filter).await.map_err(error_response)?;
    Ok(Json(items))
}

async fn queue_summary(State(state): State<AppState>) -> ApiResult<QueueSummary> {
    let summary = state.workflow.summary().await.map_err(error_response)?;
    Ok(Json(summary))
}

async fn queue_item_detail(
    State(state): State<AppState>,
    Path(queue_item_id): Path<Uuid>,
) -> ApiResult<QueueItemDetail> {
    let detail = state
        .workflow
        .detail(queue_item_id)
        .await
        .map_err(error_response)?;
    Ok(Json(detail))
}

async fn delete_queue_item(
    State(state): State<AppState>,
    Path(queue_item_id): Path<Uuid>,
) -> ApiResult<QueueItem> {
    let item = state
        .workflow
        .soft_delete(queue_item_id)
        .await
        .map_err(error_response)?;
    Ok(Json(item))
}

async fn apply_action(
    State(state): State<AppState>,
    Path(queue_item_id): Path<Uuid>,
    Json(request): Json<ValidationRequest>,
) -> ApiResult<ValidationOutcome> {
    let outcome = state
        .workflow
        .apply_action(queue_item_id, &request)
        .await
        .map_err(error_response)?;
    Ok(Json(outcome))
}

async fn publish_queue_item(
    State(state): State<AppState>,
    Path(queue_item_id): Path<Uuid>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<QueueItem> {
    if request.published_by.trim().is_empty() {
        return Err(error_response(FiscalError::InvalidInput(
            "published_by is required".to_string(),
        )));
    }

    let item = state
        .workflow
        .publish(queue_item_id, &request.published_by)
        .await
        .map_err(error_response)?;
    Ok(Json(item))
}
