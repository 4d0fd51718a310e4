// handlers/protected/activities.rs - /api/activities/ (alias /api/atividades/)

use axum::extract::{Query, State};

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::Activity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::groups::group_field;

async fn load_activity(state: &AppState, id: i64) -> Result<Activity, ApiError> {
    Activity::find(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity not found."))
}

/// GET /api/activities/?group=&limit= - Activities of the caller's groups, soonest first
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Activity>> {
    let activities = Activity::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.group(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(activities))
}

/// GET /api/activities/:id/
pub async fn detail(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Activity> {
    let activity = load_activity(&state, id).await?;
    access::require_group_access(&state.pool, &auth_user, activity.group_id).await?;
    Ok(ApiResponse::success(activity))
}

/// POST /api/activities/create/ - Group moderators; `group`, `name`, `scheduled_at` required
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<Activity> {
    payload.require(&["group", "name", "scheduled_at"])?;

    let group = group_field(&state.pool, payload.int("group")?.unwrap_or_default()).await?;
    access::require_group_moderator(&state.pool, &auth_user, group.id).await?;

    let mut activity = Activity {
        id: 0,
        group_id: group.id,
        name: payload.string("name")?.unwrap_or_default(),
        description: payload.text("description")?.unwrap_or_default(),
        scheduled_at: payload
            .datetime("scheduled_at")?
            .ok_or_else(|| ApiError::invalid_field("scheduled_at", "scheduled_at is required."))?,
    };
    activity.id = activity.insert(&state.pool).await?;

    Ok(ApiResponse::created(activity))
}

/// POST /api/activities/:id/update/ - Moving an activity needs moderator rights on both groups
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Activity> {
    let mut activity = load_activity(&state, id).await?;
    access::require_group_moderator(&state.pool, &auth_user, activity.group_id).await?;

    if let Some(group_id) = payload.int("group")? {
        let group = group_field(&state.pool, group_id).await?;
        access::require_group_moderator(&state.pool, &auth_user, group.id).await?;
        activity.group_id = group.id;
    }
    if payload.has("name") {
        payload.require(&["name"])?;
        activity.name = payload.string("name")?.unwrap_or_default();
    }
    if let Some(description) = payload.text("description")? {
        activity.description = description;
    }
    if let Some(scheduled_at) = payload.datetime("scheduled_at")? {
        activity.scheduled_at = scheduled_at;
    }
    activity.save(&state.pool).await?;

    Ok(ApiResponse::success(activity))
}

/// POST /api/activities/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let activity = load_activity(&state, id).await?;
    access::require_group_moderator(&state.pool, &auth_user, activity.group_id).await?;
    Activity::delete(&state.pool, activity.id).await?;
    Ok(ApiResponse::detail("Activity deleted."))
}
