// handlers/protected/church_files.rs - /api/church-files/ (alias /api/arquivos-igreja/)
//
// Documents shared with a church's members. Uploads are multipart with a
// `file` part; church staff manage them.

use axum::extract::{Query, State};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Church, ChurchFile, Profile, WithUrl};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

/// Members of the church, its staff and elevated callers may read its files
pub(crate) async fn can_read_church(pool: &SqlitePool, auth_user: &AuthUser, church_id: i64) -> Result<bool, ApiError> {
    if access::is_church_staff(pool, auth_user, church_id).await? {
        return Ok(true);
    }
    Ok(Profile::church_ids(pool, auth_user.profile_id()).await?.contains(&church_id))
}

/// A church named in a request body, which the caller must staff
pub(crate) async fn staffed_church_field(pool: &SqlitePool, auth_user: &AuthUser, church_id: i64) -> Result<(), ApiError> {
    if !Church::exists(pool, church_id).await? {
        return Err(ApiError::invalid_field("church", format!("Church {church_id} does not exist.")));
    }
    access::require_church_staff(pool, auth_user, church_id).await
}

fn with_url(state: &AppState, file: ChurchFile) -> WithUrl<ChurchFile> {
    let file_url = state.media.url(&file.file_path);
    WithUrl { record: file, file_url }
}

async fn load_file(state: &AppState, auth_user: &AuthUser, id: i64) -> Result<ChurchFile, ApiError> {
    let not_found = || ApiError::not_found("File not found.");
    let file = ChurchFile::find(&state.pool, id).await?.ok_or_else(not_found)?;
    if !can_read_church(&state.pool, auth_user, file.church_id).await? {
        return Err(not_found());
    }
    Ok(file)
}

/// GET /api/church-files/?church=&limit= - Newest first
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<WithUrl<ChurchFile>>> {
    let files = ChurchFile::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.church(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(files.into_iter().map(|file| with_url(&state, file)).collect()))
}

/// GET /api/church-files/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<WithUrl<ChurchFile>> {
    let file = load_file(&state, &auth_user, id).await?;
    Ok(ApiResponse::success(with_url(&state, file)))
}

/// POST /api/church-files/create/ - Multipart `church`, `file`, optional `file_name`
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Payload,
) -> ApiResult<WithUrl<ChurchFile>> {
    payload.require(&["church", "file"])?;
    let church_id = payload.int("church")?.unwrap_or_default();
    staffed_church_field(&state.pool, &auth_user, church_id).await?;

    let upload = payload
        .file("file")
        .ok_or_else(|| ApiError::invalid_field("file", "file must be an uploaded file."))?;
    let file_name = payload.string("file_name")?.unwrap_or_else(|| upload.file_name.clone());
    let file_path = state.media.save("church_files", upload).await?;

    let mut file = ChurchFile {
        id: 0,
        church_id,
        file_name,
        file_path,
        uploaded_at: Utc::now(),
    };
    file.id = file.insert(&state.pool).await?;
    info!("File {} uploaded to church {} by {}", file.id, church_id, auth_user.user.username);

    Ok(ApiResponse::created(with_url(&state, file)))
}

/// POST /api/church-files/:id/update/ - A new `file` replaces the stored one
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<WithUrl<ChurchFile>> {
    let mut file = load_file(&state, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, file.church_id).await?;

    if let Some(church_id) = payload.int("church")? {
        staffed_church_field(&state.pool, &auth_user, church_id).await?;
        file.church_id = church_id;
    }
    if payload.has("file_name") {
        payload.require(&["file_name"])?;
        file.file_name = payload.string("file_name")?.unwrap_or_default();
    }
    let stale = match payload.file("file") {
        Some(upload) => {
            let stored = state.media.save("church_files", upload).await?;
            Some(std::mem::replace(&mut file.file_path, stored))
        }
        None => None,
    };

    file.save(&state.pool).await?;
    if let Some(old) = stale {
        state.media.remove(&old).await;
    }

    Ok(ApiResponse::success(with_url(&state, file)))
}

/// POST /api/church-files/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let file = load_file(&state, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, file.church_id).await?;

    ChurchFile::delete(&state.pool, file.id).await?;
    state.media.remove(&file.file_path).await;
    Ok(ApiResponse::detail("File deleted."))
}
