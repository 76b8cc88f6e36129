//! Team management endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use forge_billing::{ActionOutcome, Subscription};
use forge_common::{ForgeError, TeamId};
use forge_tenant::{Device, Resource};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::*;
use crate::AppState;

/// Team routes, nested under `/teams`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_team).get(list_teams))
        .route("/:team", get(get_team).delete(delete_team))
        .route("/:team/type", put(change_team_type))
        .route("/:team/limits", get(team_limits))
        .route("/:team/subscription", get(team_subscription))
        .route("/:team/members", post(add_member))
        .route("/:team/devices", post(add_device))
        .route("/:team/resources", post(create_resource).get(list_resources))
}

/// Create a team; starts a trial when its team type offers one
pub async fn create_team(
    State(state): State<AppState>,
    payload: Result<Json<TeamCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TeamView>)> {
    let Json(body) = payload?;
    let owner = body.owner.unwrap_or_else(Uuid::new_v4);
    let team = state.teams.create(&body.name, body.team_type, owner)?;

    if state.config.billing.enabled {
        let policy = state.policies.get_policy(team.team_type_id)?;
        if let Some(trial) = policy.properties.active_trial() {
            let subscription = state.subscriptions.create_trial(team.id, i64::from(trial.duration));
            tracing::info!(
                team = %team.id,
                ends = ?subscription.trial_ends_at,
                "trial started"
            );
        }
    }

    Ok((StatusCode::CREATED, Json(team.into())))
}

/// Teams by creation time
pub async fn list_teams(State(state): State<AppState>) -> Json<Vec<TeamView>> {
    Json(state.teams.list().into_iter().map(TeamView::from).collect())
}

/// One team
pub async fn get_team(State(state): State<AppState>, Path(team): Path<TeamId>) -> ApiResult<Json<TeamView>> {
    Ok(Json(state.teams.get(&team)?.into()))
}

/// Delete the team and everything it owns
pub async fn delete_team(State(state): State<AppState>, Path(team): Path<TeamId>) -> ApiResult<Json<StatusResponse>> {
    state.teams.delete(&team)?;
    Ok(Json(StatusResponse::okay()))
}

/// Move a team to another team type; 400 lists every limit it would break
pub async fn change_team_type(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
    payload: Result<Json<TeamTypeChange>, JsonRejection>,
) -> ApiResult<Json<TeamView>> {
    let Json(body) = payload?;
    let team = state.teams.change_type(&team, body.team_type)?;
    Ok(Json(team.into()))
}

/// Current limits next to live counts
pub async fn team_limits(State(state): State<AppState>, Path(team): Path<TeamId>) -> ApiResult<Json<TeamLimits>> {
    let policy = state.evaluator.team_policy(&team)?;
    let usage = state.tenants.usage(&team)?;

    let instances = state
        .catalog
        .list()
        .into_iter()
        .map(|instance_type| {
            let limit = policy.properties.instance_limit(instance_type.id);
            InstanceLimitView {
                count: usage.instances_of(instance_type.id),
                limit: limit.effective(),
                active: limit.active,
                name: instance_type.name,
                instance_type: instance_type.hashid,
            }
        })
        .collect();

    Ok(Json(TeamLimits {
        users: LimitUsage {
            limit: policy.properties.users.as_limit(),
            count: usage.members,
        },
        devices: LimitUsage {
            limit: policy.properties.devices.as_limit(),
            count: usage.devices,
        },
        instances,
    }))
}

/// 404 when the team has never had billing
pub async fn team_subscription(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
) -> ApiResult<Json<Subscription>> {
    state.teams.get(&team)?;
    let subscription = state
        .subscriptions
        .for_team(&team)
        .ok_or_else(|| ForgeError::not_found(format!("subscription for team {}", team)))?;
    Ok(Json(subscription))
}

/// 400 `member_limit_reached` when the team is full
pub async fn add_member(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
    payload: Result<Json<MemberAdd>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let Json(body) = payload?;
    state.teams.add_member(&team, body.user, body.role)?;
    Ok((StatusCode::CREATED, Json(StatusResponse::okay())))
}

/// 400 `device_limit_reached` when the team is full
pub async fn add_device(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
    payload: Result<Json<DeviceAdd>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Device>)> {
    let Json(body) = payload?;
    let device = state.teams.add_device(&team, &body.name)?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Create a resource through the lifecycle gate
pub async fn create_resource(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
    payload: Result<Json<ResourceCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ActionOutcome>)> {
    let Json(body) = payload?;
    state.teams.get(&team)?;
    let outcome = state.gate.create_resource(&team, &body.name, body.instance_type)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Every resource of the team
pub async fn list_resources(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
) -> ApiResult<Json<Vec<Resource>>> {
    state.teams.get(&team)?;
    Ok(Json(state.tenants.team_resources(&team)))
}
