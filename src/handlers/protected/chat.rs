// handlers/protected/chat.rs - /api/groups/:id/chat/

use axum::extract::{Query, State};

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::ChatMessage;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::groups::load_group;

const DEFAULT_HISTORY: i64 = 100;

/// GET /api/groups/:id/chat/?limit= - The latest messages, oldest first
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ChatMessage>> {
    let group = load_group(&state.pool, id).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;
    let messages = ChatMessage::list_for_group(&state.pool, group.id, query.limit(DEFAULT_HISTORY)).await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/groups/:id/chat/ - `content` required
pub async fn send(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<ChatMessage> {
    let group = load_group(&state.pool, id).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;
    payload.require(&["content"])?;

    let content = payload.text("content")?.unwrap_or_default();
    let message_id = ChatMessage::insert(&state.pool, group.id, auth_user.profile_id(), content.trim()).await?;
    let message = find_message(&state, group.id, message_id).await?;
    Ok(ApiResponse::created(message))
}

async fn find_message(state: &AppState, group_id: i64, id: i64) -> Result<ChatMessage, ApiError> {
    ChatMessage::find(&state.pool, group_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found."))
}

/// POST /api/groups/:id/chat/:message_id/update/ - Authors edit their own messages
pub async fn edit(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, message_id)): Path<(i64, i64)>,
    payload: Payload,
) -> ApiResult<ChatMessage> {
    let message = find_message(&state, id, message_id).await?;
    if message.author_id != auth_user.profile_id() {
        return Err(ApiError::forbidden("Only the author can edit this message."));
    }
    payload.require(&["content"])?;

    let content = payload.text("content")?.unwrap_or_default();
    ChatMessage::edit(&state.pool, message.id, content.trim()).await?;
    Ok(ApiResponse::success(find_message(&state, id, message.id).await?))
}

/// POST /api/groups/:id/chat/:message_id/delete/ - Author or group moderator
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, message_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    let message = find_message(&state, id, message_id).await?;
    if message.author_id != auth_user.profile_id() {
        access::require_group_moderator(&state.pool, &auth_user, message.group_id).await?;
    }
    ChatMessage::delete(&state.pool, message.id).await?;
    Ok(ApiResponse::detail("Message deleted."))
}
