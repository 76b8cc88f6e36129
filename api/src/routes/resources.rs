//! Resource lifecycle endpoints

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use forge_billing::ActionOutcome;
use forge_common::ResourceId;

use crate::error::ApiResult;
use crate::models::StatusResponse;
use crate::AppState;

/// Resource routes, nested under `/resources`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_resource).delete(delete_resource))
        .route("/:id/actions/start", post(start_resource))
        .route("/:id/actions/suspend", post(suspend_resource))
}

/// Resource with any transitional state
pub async fn get_resource(State(state): State<AppState>, Path(id): Path<ResourceId>) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.gate.status(&id)?))
}

/// Destroy the resource and release its billed quantity
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<StatusResponse>> {
    state.gate.destroy(&id)?;
    Ok(Json(StatusResponse::okay()))
}

/// 402 when the team's trial has ended or it has no subscription
pub async fn start_resource(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.gate.start(&id)?))
}

/// Suspend a resource; never blocked by billing
pub async fn suspend_resource(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.gate.suspend(&id)?))
}
