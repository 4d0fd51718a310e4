// handlers/protected/groups.rs - /api/groups/ (alias /api/grupos/)
//
// Groups are teams inside a church. Members see their own groups; church
// staff create and maintain them along with the roles members can hold.

use axum::extract::{Query, State};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Church, Group, GroupRole};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

pub(crate) async fn load_group(pool: &SqlitePool, id: i64) -> Result<Group, ApiError> {
    Group::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))
}

/// A group named in a request body; unknown ids are a bad `group` field, not a 404
pub(crate) async fn group_field(pool: &SqlitePool, id: i64) -> Result<Group, ApiError> {
    Group::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("group", format!("Group {id} does not exist.")))
}

/// GET /api/groups/?church= - The caller's groups; elevated callers see all
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Group>> {
    let groups = match auth_user.visibility_scope() {
        None => Group::list(&state.pool, query.church()).await?,
        Some(profile_id) => Group::list_for_member(&state.pool, profile_id, query.church()).await?,
    };
    Ok(ApiResponse::success(groups))
}

/// GET /api/groups/:id/
pub async fn detail(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Group> {
    let group = load_group(&state.pool, id).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;
    Ok(ApiResponse::success(group))
}

/// POST /api/groups/create/ - `church` and `name` required; church staff only
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<Group> {
    payload.require(&["church", "name"])?;
    let church_id = payload.int("church")?.unwrap_or_default();
    if !Church::exists(&state.pool, church_id).await? {
        return Err(ApiError::invalid_field("church", format!("Church {church_id} does not exist.")));
    }
    access::require_church_staff(&state.pool, &auth_user, church_id).await?;

    let mut group = Group {
        id: 0,
        church_id,
        name: payload.string("name")?.unwrap_or_default(),
        description: payload.text("description")?.unwrap_or_default(),
        is_active: payload.bool("is_active")?.unwrap_or(true),
        created_by: Some(auth_user.user_id()),
        created_at: Utc::now(),
    };
    group.id = group.insert(&state.pool).await?;
    info!("Group {} ({}) created in church {}", group.id, group.name, church_id);

    Ok(ApiResponse::created(group))
}

/// POST /api/groups/:id/update/
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Group> {
    let mut group = load_group(&state.pool, id).await?;
    access::require_church_staff(&state.pool, &auth_user, group.church_id).await?;

    if payload.has("name") {
        payload.require(&["name"])?;
        group.name = payload.string("name")?.unwrap_or_default();
    }
    if let Some(description) = payload.text("description")? {
        group.description = description;
    }
    if let Some(is_active) = payload.bool("is_active")? {
        group.is_active = is_active;
    }
    group.save(&state.pool).await?;

    Ok(ApiResponse::success(group))
}

/// POST /api/groups/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let group = load_group(&state.pool, id).await?;
    access::require_church_staff(&state.pool, &auth_user, group.church_id).await?;
    Group::delete(&state.pool, group.id).await?;
    info!("Group {} deleted by {}", group.id, auth_user.user.username);
    Ok(ApiResponse::detail("Group deleted."))
}

/// GET /api/groups/:id/roles/ - Highest rank first
pub async fn roles(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<GroupRole>> {
    let group = load_group(&state.pool, id).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;
    Ok(ApiResponse::success(GroupRole::list_for_group(&state.pool, group.id).await?))
}

/// POST /api/groups/:id/roles/ - `name` required, `rank` >= 0
pub async fn add_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<GroupRole> {
    let group = load_group(&state.pool, id).await?;
    access::require_church_staff(&state.pool, &auth_user, group.church_id).await?;
    payload.require(&["name"])?;

    let rank = payload.int("rank")?.unwrap_or(0);
    if rank < 0 {
        return Err(ApiError::invalid_field("rank", "rank must be zero or greater."));
    }
    let mut role = GroupRole {
        id: 0,
        group_id: group.id,
        name: payload.string("name")?.unwrap_or_default(),
        rank,
        can_manage_chat: payload.bool("can_manage_chat")?.unwrap_or(false),
        can_promote_members: payload.bool("can_promote_members")?.unwrap_or(false),
    };
    role.id = role.insert(&state.pool).await?;
    Ok(ApiResponse::created(role))
}

/// POST /api/groups/:id/roles/:role_id/delete/ - Members holding it keep their membership
pub async fn delete_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, role_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    let group = load_group(&state.pool, id).await?;
    access::require_church_staff(&state.pool, &auth_user, group.church_id).await?;
    if !GroupRole::delete(&state.pool, group.id, role_id).await? {
        return Err(ApiError::not_found("Role not found."));
    }
    Ok(ApiResponse::detail("Role deleted."))
}
