// handlers/protected/announcements.rs - /api/communiques/ and /api/notices/
// (aliases /api/comunicados/ and /api/avisos/)
//
// Both resources share these handlers. The router attaches the
// `AnnouncementKind` as an extension, and every query is filtered by it.

use axum::extract::{Query, State};
use axum::Extension;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Announcement, AnnouncementDetail, AnnouncementKind, Church, Profile};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

async fn load_announcement(pool: &SqlitePool, kind: AnnouncementKind, id: i64) -> Result<Announcement, ApiError> {
    Announcement::find(pool, kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found.", kind.label())))
}

/// Every id must name an existing profile
async fn checked_recipients(pool: &SqlitePool, payload: &Payload) -> Result<Option<Vec<i64>>, ApiError> {
    let Some(mut ids) = payload.id_list("recipients")? else {
        return Ok(None);
    };
    ids.sort_unstable();
    ids.dedup();
    let found = Profile::existing_ids(pool, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(ApiError::invalid_field("recipients", format!("Profile {missing} does not exist.")));
    }
    Ok(Some(ids))
}

/// GET /api/communiques/?limit= - Newest first; others see their churches' and their own
pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<AnnouncementKind>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Announcement>> {
    let limit = query.limit(state.default_limit());
    let announcements = match auth_user.visibility_scope() {
        None => Announcement::list_all(&state.pool, kind, limit).await?,
        Some(profile_id) => Announcement::list_visible_to(&state.pool, kind, profile_id, limit).await?,
    };
    Ok(ApiResponse::success(announcements))
}

/// GET /api/communiques/:id/
pub async fn detail(
    State(state): State<AppState>,
    Extension(kind): Extension<AnnouncementKind>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<AnnouncementDetail> {
    let announcement = load_announcement(&state.pool, kind, id).await?;
    if let Some(profile_id) = auth_user.visibility_scope() {
        if !Announcement::is_visible_to(&state.pool, announcement.id, profile_id).await? {
            return Err(ApiError::not_found(format!("{} not found.", kind.label())));
        }
    }
    Ok(ApiResponse::success(announcement.into_detail(&state.pool).await?))
}

/// POST /api/communiques/create/ - Church staff; `church`, `title`, `message` required
pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<AnnouncementKind>,
    auth_user: AuthUser,
    payload: Payload,
) -> ApiResult<AnnouncementDetail> {
    payload.require(&["church", "title", "message"])?;

    let church_id = payload.int("church")?.unwrap_or_default();
    if !Church::exists(&state.pool, church_id).await? {
        return Err(ApiError::invalid_field("church", format!("Church {church_id} does not exist.")));
    }
    access::require_church_staff(&state.pool, &auth_user, church_id).await?;
    let recipients = checked_recipients(&state.pool, &payload).await?;

    let mut announcement = Announcement {
        id: 0,
        church_id,
        kind: kind.as_str().to_string(),
        title: payload.string("title")?.unwrap_or_default(),
        message: payload.text("message")?.unwrap_or_default(),
        sent_at: Utc::now(),
    };
    announcement.id = announcement.insert(&state.pool).await?;
    if let Some(ids) = recipients {
        Announcement::set_recipients(&state.pool, announcement.id, &ids).await?;
    }
    info!("{} {} sent by {}", kind.label(), announcement.id, auth_user.user.username);

    Ok(ApiResponse::created(announcement.into_detail(&state.pool).await?))
}

/// POST /api/communiques/:id/update/ - `recipients`, when sent, replaces the list
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<AnnouncementKind>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<AnnouncementDetail> {
    let mut announcement = load_announcement(&state.pool, kind, id).await?;
    access::require_church_staff(&state.pool, &auth_user, announcement.church_id).await?;

    if let Some(church_id) = payload.int("church")? {
        if !Church::exists(&state.pool, church_id).await? {
            return Err(ApiError::invalid_field("church", format!("Church {church_id} does not exist.")));
        }
        access::require_church_staff(&state.pool, &auth_user, church_id).await?;
        announcement.church_id = church_id;
    }
    if payload.has("title") {
        payload.require(&["title"])?;
        announcement.title = payload.string("title")?.unwrap_or_default();
    }
    if payload.has("message") {
        payload.require(&["message"])?;
        announcement.message = payload.text("message")?.unwrap_or_default();
    }
    let recipients = checked_recipients(&state.pool, &payload).await?;

    announcement.save(&state.pool).await?;
    if let Some(ids) = recipients {
        Announcement::set_recipients(&state.pool, announcement.id, &ids).await?;
    }

    Ok(ApiResponse::success(announcement.into_detail(&state.pool).await?))
}

/// POST /api/communiques/:id/delete/
pub async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<AnnouncementKind>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Detail> {
    let announcement = load_announcement(&state.pool, kind, id).await?;
    access::require_church_staff(&state.pool, &auth_user, announcement.church_id).await?;
    Announcement::delete(&state.pool, announcement.id).await?;
    Ok(ApiResponse::detail(format!("{} deleted.", kind.label())))
}
