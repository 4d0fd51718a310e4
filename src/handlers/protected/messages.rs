// handlers/protected/messages.rs - /api/private-messages/ (alias /api/mensagens-privadas/)
//
// Only the two people in a conversation can see a message. The sender may
// reword it, the recipient may mark it read.

use axum::extract::{Query, State};
use tracing::debug;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::database::models::{PrivateMessage, Profile};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

/// Messages outside the caller's conversations are reported as missing
async fn load_message(state: &AppState, auth_user: &AuthUser, id: i64) -> Result<PrivateMessage, ApiError> {
    match PrivateMessage::find(&state.pool, id).await? {
        Some(message) if message.involves(auth_user.profile_id()) => Ok(message),
        _ => Err(ApiError::not_found("Message not found.")),
    }
}

/// GET /api/private-messages/?unread=true - Sent and received, newest first
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<PrivateMessage>> {
    let messages = PrivateMessage::list_for_profile(
        &state.pool,
        auth_user.profile_id(),
        query.unread_only(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(messages))
}

/// GET /api/private-messages/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<PrivateMessage> {
    Ok(ApiResponse::success(load_message(&state, &auth_user, id).await?))
}

/// POST /api/private-messages/create/ - `recipient` and `content` required
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<PrivateMessage> {
    payload.require(&["recipient", "content"])?;

    let recipient_id = payload.int("recipient")?.unwrap_or_default();
    if recipient_id == auth_user.profile_id() {
        return Err(ApiError::invalid_field("recipient", "You cannot send a message to yourself."));
    }
    if !Profile::exists(&state.pool, recipient_id).await? {
        return Err(ApiError::invalid_field("recipient", format!("Profile {recipient_id} does not exist.")));
    }

    let content = payload.text("content")?.unwrap_or_default();
    let id = PrivateMessage::insert(&state.pool, auth_user.profile_id(), recipient_id, &content).await?;
    debug!("Message {} from profile {} to {}", id, auth_user.profile_id(), recipient_id);

    Ok(ApiResponse::created(load_message(&state, &auth_user, id).await?))
}

/// POST /api/private-messages/:id/update/
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<PrivateMessage> {
    let mut message = load_message(&state, &auth_user, id).await?;
    let profile_id = auth_user.profile_id();

    if payload.has("content") {
        if message.sender_id != profile_id {
            return Err(ApiError::forbidden("Only the sender can edit this message."));
        }
        payload.require(&["content"])?;
        message.content = payload.text("content")?.unwrap_or_default();
    }
    if let Some(is_read) = payload.bool("is_read")? {
        if message.recipient_id != profile_id {
            return Err(ApiError::forbidden("Only the recipient can mark this message as read."));
        }
        message.is_read = is_read;
    }
    message.save(&state.pool).await?;

    Ok(ApiResponse::success(message))
}

/// POST /api/private-messages/:id/delete/ - Sender or elevated
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let message = match PrivateMessage::find(&state.pool, id).await? {
        Some(message) if message.involves(auth_user.profile_id()) || auth_user.is_elevated() => message,
        _ => return Err(ApiError::not_found("Message not found.")),
    };
    if message.sender_id != auth_user.profile_id() && !auth_user.is_elevated() {
        return Err(ApiError::forbidden("Only the sender can delete this message."));
    }
    PrivateMessage::delete(&state.pool, message.id).await?;
    Ok(ApiResponse::detail("Message deleted."))
}
