// handlers/protected/resources.rs - /api/educational-resources/ (alias /api/recursos-educacionais/)

use axum::extract::{Query, State};
use chrono::Utc;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{EducationalResource, WithUrl};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::church_files::{can_read_church, staffed_church_field};

fn with_url(state: &AppState, resource: EducationalResource) -> WithUrl<EducationalResource> {
    let file_url = state.media.url(&resource.file_path);
    WithUrl {
        record: resource,
        file_url,
    }
}

async fn load_resource(state: &AppState, auth_user: &AuthUser, id: i64) -> Result<EducationalResource, ApiError> {
    let not_found = || ApiError::not_found("Resource not found.");
    let resource = EducationalResource::find(&state.pool, id).await?.ok_or_else(not_found)?;
    if !can_read_church(&state.pool, auth_user, resource.church_id).await? {
        return Err(not_found());
    }
    Ok(resource)
}

/// GET /api/educational-resources/?church=&limit=
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<WithUrl<EducationalResource>>> {
    let resources = EducationalResource::list(
        &state.pool,
        auth_user.visibility_scope(),
        query.church(),
        query.limit(state.default_limit()),
    )
    .await?;
    Ok(ApiResponse::success(
        resources.into_iter().map(|resource| with_url(&state, resource)).collect(),
    ))
}

/// GET /api/educational-resources/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<WithUrl<EducationalResource>> {
    let resource = load_resource(&state, &auth_user, id).await?;
    Ok(ApiResponse::success(with_url(&state, resource)))
}

/// POST /api/educational-resources/create/ - Multipart `church`, `title`, `file`, optional `description`
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Payload,
) -> ApiResult<WithUrl<EducationalResource>> {
    payload.require(&["church", "title", "file"])?;
    let church_id = payload.int("church")?.unwrap_or_default();
    staffed_church_field(&state.pool, &auth_user, church_id).await?;

    let upload = payload
        .file("file")
        .ok_or_else(|| ApiError::invalid_field("file", "file must be an uploaded file."))?;
    let file_path = state.media.save("resources", upload).await?;

    let mut resource = EducationalResource {
        id: 0,
        church_id,
        title: payload.string("title")?.unwrap_or_default(),
        description: payload.text("description")?.unwrap_or_default(),
        file_path,
        uploaded_at: Utc::now(),
    };
    resource.id = resource.insert(&state.pool).await?;

    Ok(ApiResponse::created(with_url(&state, resource)))
}

/// POST /api/educational-resources/:id/update/
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<WithUrl<EducationalResource>> {
    let mut resource = load_resource(&state, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, resource.church_id).await?;

    if let Some(church_id) = payload.int("church")? {
        staffed_church_field(&state.pool, &auth_user, church_id).await?;
        resource.church_id = church_id;
    }
    if payload.has("title") {
        payload.require(&["title"])?;
        resource.title = payload.string("title")?.unwrap_or_default();
    }
    if let Some(description) = payload.text("description")? {
        resource.description = description;
    }
    let stale = match payload.file("file") {
        Some(upload) => {
            let stored = state.media.save("resources", upload).await?;
            Some(std::mem::replace(&mut resource.file_path, stored))
        }
        None => None,
    };

    resource.save(&state.pool).await?;
    if let Some(old) = stale {
        state.media.remove(&old).await;
    }

    Ok(ApiResponse::success(with_url(&state, resource)))
}

/// POST /api/educational-resources/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let resource = load_resource(&state, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, resource.church_id).await?;

    EducationalResource::delete(&state.pool, resource.id).await?;
    state.media.remove(&resource.file_path).await;
    Ok(ApiResponse::detail("Resource deleted."))
}
