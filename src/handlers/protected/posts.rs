// handlers/protected/posts.rs - /api/posts/ (alias /api/postagens-grupos/)
//
// Group wall posts. Any member may post; authors and group moderators may
// edit or remove. Attachments arrive as a multipart `attachment` file.

use axum::extract::{Query, State};
use chrono::Utc;
use sqlx::types::Json;
use tracing::info;
use url::Url;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Post, PostView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::groups::group_field;

async fn load_post(state: &AppState, id: i64) -> Result<Post, ApiError> {
    Post::find(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found."))
}

fn view(state: &AppState, post: Post) -> PostView {
    let attachment_url = post.attachment.as_deref().map(|path| state.media.url(path));
    PostView { post, attachment_url }
}

/// Blank clears the link; anything else must be an http(s) URL
fn checked_link(raw: &str) -> Result<Option<String>, ApiError> {
    let link = raw.trim();
    if link.is_empty() {
        return Ok(None);
    }
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && !link.contains(char::is_whitespace) => {
            Ok(Some(url.to_string()))
        }
        _ => Err(ApiError::invalid_field("link", "link must be an http or https URL.")),
    }
}

async fn require_author_or_moderator(state: &AppState, auth_user: &AuthUser, post: &Post) -> Result<(), ApiError> {
    if post.author_id == auth_user.profile_id() {
        return Ok(());
    }
    access::require_group_moderator(&state.pool, auth_user, post.group_id).await
}

/// GET /api/posts/?group=&limit= - Newest first
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<PostView>> {
    let posts = Post::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.group(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(posts.into_iter().map(|post| view(&state, post)).collect()))
}

/// GET /api/posts/:id/
pub async fn detail(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<PostView> {
    let post = load_post(&state, id).await?;
    access::require_group_access(&state.pool, &auth_user, post.group_id).await?;
    Ok(ApiResponse::success(view(&state, post)))
}

/// POST /api/posts/create/ - Members of `group`; `content` required
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<PostView> {
    payload.require(&["group", "content"])?;

    let group = group_field(&state.pool, payload.int("group")?.unwrap_or_default()).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;

    let link = match payload.text("link")? {
        Some(raw) => checked_link(&raw)?,
        None => None,
    };
    let poll = payload.json("poll")?.map(Json);
    let attachment = match payload.file("attachment") {
        Some(upload) => Some(state.media.save("posts", upload).await?),
        None => None,
    };

    let post_id = Post {
        id: 0,
        group_id: group.id,
        author_id: auth_user.profile_id(),
        author_name: String::new(),
        content: payload.text("content")?.unwrap_or_default(),
        attachment,
        poll,
        link,
        posted_at: Utc::now(),
    }
    .insert(&state.pool)
    .await?;
    info!("Post {} added to group {} by {}", post_id, group.id, auth_user.user.username);

    let post = load_post(&state, post_id).await?;
    Ok(ApiResponse::created(view(&state, post)))
}

/// POST /api/posts/:id/update/ - Author or moderator. A new `attachment`
/// replaces the old file; `remove_attachment=true` drops it.
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<PostView> {
    let mut post = load_post(&state, id).await?;
    require_author_or_moderator(&state, &auth_user, &post).await?;

    if payload.has("content") {
        payload.require(&["content"])?;
        post.content = payload.text("content")?.unwrap_or_default();
    }
    if let Some(raw) = payload.text("link")? {
        post.link = checked_link(&raw)?;
    }
    if payload.has("poll") {
        post.poll = payload.json("poll")?.map(Json);
    }

    let mut stale = None;
    if let Some(upload) = payload.file("attachment") {
        let stored = state.media.save("posts", upload).await?;
        stale = post.attachment.replace(stored);
    } else if payload.bool("remove_attachment")?.unwrap_or(false) {
        stale = post.attachment.take();
    }

    post.save(&state.pool).await?;
    if let Some(old) = stale {
        state.media.remove(&old).await;
    }

    Ok(ApiResponse::success(view(&state, post)))
}

/// POST /api/posts/:id/delete/ - Comments go with the post
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let post = load_post(&state, id).await?;
    require_author_or_moderator(&state, &auth_user, &post).await?;

    Post::delete(&state.pool, post.id).await?;
    if let Some(attachment) = &post.attachment {
        state.media.remove(attachment).await;
    }
    Ok(ApiResponse::detail("Post deleted."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_must_be_web_urls() {
        assert_eq!(checked_link("  ").unwrap(), None);
        assert_eq!(
            checked_link(" https://iasd.local/culto ").unwrap().as_deref(),
            Some("https://iasd.local/culto")
        );
        assert!(checked_link("ftp://iasd.local").is_err());
        assert!(checked_link("https://iasd.local/a b").is_err());
    }
}
