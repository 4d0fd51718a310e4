// handlers/protected/group_notifications.rs - /api/group-notifications/ (alias /api/notificacoes-grupos/)
//
// A notification belongs to one profile. Its owner may mark it read; the
// group's moderators may reword or remove it.

use axum::extract::{Query, State};

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{GroupNotification, Membership, Profile};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::groups::group_field;

async fn load_notification(state: &AppState, id: i64) -> Result<GroupNotification, ApiError> {
    GroupNotification::find(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found."))
}

/// GET /api/group-notifications/?unread=true - Own notifications; elevated callers see all
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<GroupNotification>> {
    let notifications = GroupNotification::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.unread_only(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(notifications))
}

/// GET /api/group-notifications/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<GroupNotification> {
    let notification = load_notification(&state, id).await?;
    if notification.profile_id != auth_user.profile_id() {
        access::require_group_moderator(&state.pool, &auth_user, notification.group_id).await?;
    }
    Ok(ApiResponse::success(notification))
}

/// POST /api/group-notifications/create/ - Moderators notify one member (`group`, `profile`, `message`)
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Payload,
) -> ApiResult<GroupNotification> {
    payload.require(&["group", "profile", "message"])?;

    let group = group_field(&state.pool, payload.int("group")?.unwrap_or_default()).await?;
    access::require_group_moderator(&state.pool, &auth_user, group.id).await?;

    let profile_id = payload.int("profile")?.unwrap_or_default();
    if !Profile::exists(&state.pool, profile_id).await? {
        return Err(ApiError::invalid_field("profile", format!("Profile {profile_id} does not exist.")));
    }
    if !Membership::is_active_member(&state.pool, group.id, profile_id).await? {
        return Err(ApiError::invalid_field("profile", "The profile is not a member of this group."));
    }

    let message = payload.text("message")?.unwrap_or_default();
    let id = GroupNotification::insert(&state.pool, group.id, profile_id, message.trim()).await?;
    Ok(ApiResponse::created(load_notification(&state, id).await?))
}

/// POST /api/group-notifications/:id/update/
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<GroupNotification> {
    let mut notification = load_notification(&state, id).await?;
    let is_owner = notification.profile_id == auth_user.profile_id();
    let is_moderator = access::is_group_moderator(&state.pool, &auth_user, notification.group_id).await?;
    if !is_owner && !is_moderator {
        return Err(ApiError::forbidden("You cannot change this notification."));
    }

    if payload.has("message") {
        if !is_moderator {
            return Err(ApiError::forbidden("Only group moderators can edit the message."));
        }
        payload.require(&["message"])?;
        notification.message = payload.text("message")?.unwrap_or_default().trim().to_string();
    }
    if let Some(is_read) = payload.bool("is_read")? {
        notification.is_read = is_read;
    }
    notification.save(&state.pool).await?;

    Ok(ApiResponse::success(notification))
}

/// POST /api/group-notifications/:id/delete/ - Owner or moderator
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let notification = load_notification(&state, id).await?;
    if notification.profile_id != auth_user.profile_id() {
        access::require_group_moderator(&state.pool, &auth_user, notification.group_id).await?;
    }
    GroupNotification::delete(&state.pool, notification.id).await?;
    Ok(ApiResponse::detail("Notification deleted."))
}
