// handlers/protected/notify.rs - /api/profiles/notify/

use axum::extract::{Query, State};
use serde::Serialize;
use tracing::info;

use crate::api::{ListQuery, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::GroupNotification;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::groups::group_field;

#[derive(Debug, Serialize)]
pub struct Broadcast {
    pub detail: String,
    pub group: i64,
    pub notified: u64,
}

/// GET /api/profiles/notify/?unread=true - The caller's own notifications
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<GroupNotification>> {
    let notifications = GroupNotification::list(
        &state.pool,
        Some(auth_user.profile_id()),
        query.unread_only(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(notifications))
}

/// POST /api/profiles/notify/ - Notify every active member of `group`
pub async fn send(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<Broadcast> {
    payload.require(&["group", "message"])?;

    let group_id = payload.int("group")?.unwrap_or_default();
    let group = group_field(&state.pool, group_id).await?;
    access::require_group_moderator(&state.pool, &auth_user, group.id).await?;

    let message = payload.text("message")?.unwrap_or_default();
    let notified = GroupNotification::broadcast(&state.pool, group.id, message.trim()).await?;
    info!("{} notified {} members of group {}", auth_user.user.username, notified, group.id);

    Ok(ApiResponse::created(Broadcast {
        detail: "Notifications sent.".to_string(),
        group: group.id,
        notified,
    }))
}
