// handlers/protected/comments.rs - /api/comments/ (alias /api/comentarios-postagens/)

use axum::extract::{Query, State};

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Comment, Post};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

async fn load_comment(state: &AppState, id: i64) -> Result<Comment, ApiError> {
    Comment::find(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found."))
}

async fn require_author_or_moderator(state: &AppState, auth_user: &AuthUser, comment: &Comment) -> Result<(), ApiError> {
    if comment.author_id == auth_user.profile_id() {
        return Ok(());
    }
    access::require_group_moderator(&state.pool, auth_user, comment.group_id).await
}

/// GET /api/comments/?post=&limit= - Oldest first, only on posts the caller can see
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Comment>> {
    let comments = Comment::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.post(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(comments))
}

/// GET /api/comments/:id/
pub async fn detail(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Comment> {
    let comment = load_comment(&state, id).await?;
    access::require_group_access(&state.pool, &auth_user, comment.group_id).await?;
    Ok(ApiResponse::success(comment))
}

/// POST /api/comments/create/ - `post` and `content` required
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<Comment> {
    payload.require(&["post", "content"])?;

    let post_id = payload.int("post")?.unwrap_or_default();
    let post = Post::find(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("post", format!("Post {post_id} does not exist.")))?;
    access::require_group_access(&state.pool, &auth_user, post.group_id).await?;

    let content = payload.text("content")?.unwrap_or_default();
    let id = Comment::insert(&state.pool, post.id, auth_user.profile_id(), content.trim()).await?;
    Ok(ApiResponse::created(load_comment(&state, id).await?))
}

/// POST /api/comments/:id/update/ - Author or moderator; `content` required
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Comment> {
    let comment = load_comment(&state, id).await?;
    require_author_or_moderator(&state, &auth_user, &comment).await?;
    payload.require(&["content"])?;

    let content = payload.text("content")?.unwrap_or_default();
    Comment::set_content(&state.pool, comment.id, content.trim()).await?;
    Ok(ApiResponse::success(load_comment(&state, comment.id).await?))
}

/// POST /api/comments/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let comment = load_comment(&state, id).await?;
    require_author_or_moderator(&state, &auth_user, &comment).await?;
    Comment::delete(&state.pool, comment.id).await?;
    Ok(ApiResponse::detail("Comment deleted."))
}
