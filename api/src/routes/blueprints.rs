//! Flow blueprint endpoints
//!
//! Readable by any team role, writable by admins only.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use forge_tenant::{BlueprintFilter, BlueprintPage, FlowBlueprint, FlowBlueprintUpdate, NewFlowBlueprint, Pagination};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::{Caller, Permission};
use crate::models::{BlueprintListQuery, StatusResponse};
use crate::AppState;

/// Blueprint routes, nested under `/flow-blueprints`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blueprints).post(create_blueprint))
        .route(
            "/:id",
            get(get_blueprint).put(update_blueprint).delete(delete_blueprint),
        )
}

/// List blueprints; active ones unless `filter` says otherwise
pub async fn list_blueprints(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<BlueprintListQuery>,
) -> ApiResult<Json<BlueprintPage>> {
    caller.require(Permission::FlowBlueprintList)?;
    let pagination = Pagination {
        cursor: query.cursor,
        limit: query.limit,
    };
    let filter = query
        .filter
        .as_deref()
        .map(BlueprintFilter::from_query)
        .unwrap_or_default();
    Ok(Json(state.blueprints.list(filter, pagination)))
}

/// One blueprint with its flows and modules
pub async fn get_blueprint(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FlowBlueprint>> {
    caller.require(Permission::FlowBlueprintRead)?;
    Ok(Json(state.blueprints.get(&id)?))
}

/// Admins only
pub async fn create_blueprint(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewFlowBlueprint>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FlowBlueprint>)> {
    caller.require(Permission::FlowBlueprintCreate)?;
    let Json(body) = payload?;
    Ok((StatusCode::CREATED, Json(state.blueprints.create(body)?)))
}

/// Partial update; admins only
pub async fn update_blueprint(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    payload: Result<Json<FlowBlueprintUpdate>, JsonRejection>,
) -> ApiResult<Json<FlowBlueprint>> {
    caller.require(Permission::FlowBlueprintEdit)?;
    let Json(body) = payload?;
    Ok(Json(state.blueprints.update(&id, body)?))
}

/// Admins only
pub async fn delete_blueprint(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    caller.require(Permission::FlowBlueprintDelete)?;
    state.blueprints.delete(&id)?;
    Ok(Json(StatusResponse::okay()))
}
