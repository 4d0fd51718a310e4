// handlers/protected/members.rs - /api/groups/:id/members/

use axum::extract::State;
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Group, GroupRole, Membership, Profile};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

use super::groups::load_group;

/// Resolve `role` within the group and make sure the caller may hand it out.
/// `own_role` is the caller's role when their right comes from it rather
/// than from elevation or staff status.
async fn assignable_role(
    pool: &SqlitePool,
    group: &Group,
    role_id: i64,
    own_role: Option<&GroupRole>,
) -> Result<GroupRole, ApiError> {
    let role = GroupRole::find(pool, group.id, role_id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("role", format!("Role {role_id} does not belong to this group.")))?;
    if let Some(own) = own_role {
        if role.rank > own.rank {
            return Err(ApiError::forbidden("You cannot assign a role ranked above your own."));
        }
    }
    Ok(role)
}

/// A caller acting through their role may not touch a member who outranks them
async fn require_outranks(
    pool: &SqlitePool,
    group: &Group,
    profile_id: i64,
    own_role: Option<&GroupRole>,
) -> Result<(), ApiError> {
    let Some(own) = own_role else {
        return Ok(());
    };
    match access::group_role(pool, profile_id, group.id).await? {
        Some(current) if current.rank > own.rank => {
            Err(ApiError::forbidden("You cannot manage a member ranked above you."))
        }
        _ => Ok(()),
    }
}

/// Church staff manage every membership; otherwise the caller needs a promoting role
async fn require_member_manager(
    pool: &SqlitePool,
    auth_user: &AuthUser,
    group: &Group,
) -> Result<Option<GroupRole>, ApiError> {
    if access::is_church_staff(pool, auth_user, group.church_id).await? {
        return Ok(None);
    }
    access::require_group_promoter(pool, auth_user, group.id).await
}

/// GET /api/groups/:id/members/
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Membership>> {
    let group = load_group(&state.pool, id).await?;
    access::require_group_access(&state.pool, &auth_user, group.id).await?;
    Ok(ApiResponse::success(Membership::list_for_group(&state.pool, group.id).await?))
}

/// POST /api/groups/:id/members/ - Add `profile`, optionally with a `role`.
/// Re-adding a former member reactivates the old membership.
pub async fn add(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Membership> {
    let group = load_group(&state.pool, id).await?;
    let own_role = require_member_manager(&state.pool, &auth_user, &group).await?;
    payload.require(&["profile"])?;

    let profile_id = payload.int("profile")?.unwrap_or_default();
    if !Profile::exists(&state.pool, profile_id).await? {
        return Err(ApiError::invalid_field("profile", format!("Profile {profile_id} does not exist.")));
    }
    require_outranks(&state.pool, &group, profile_id, own_role.as_ref()).await?;
    let role_id = match payload.int("role")? {
        Some(role_id) => Some(assignable_role(&state.pool, &group, role_id, own_role.as_ref()).await?.id),
        None => None,
    };

    Membership::upsert(&state.pool, group.id, profile_id, role_id).await?;
    let membership = Membership::find(&state.pool, group.id, profile_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Membership vanished after write"))?;
    info!("Profile {} joined group {}", profile_id, group.id);

    Ok(ApiResponse::created(membership))
}

/// POST /api/groups/:id/members/:profile_id/promote/ - Give the member `role`.
/// Church staff assign any role; promoters only up to their own rank.
pub async fn promote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, profile_id)): Path<(i64, i64)>,
    payload: Payload,
) -> ApiResult<Membership> {
    let group = load_group(&state.pool, id).await?;
    let own_role = require_member_manager(&state.pool, &auth_user, &group).await?;
    payload.require(&["role"])?;

    let role_id = payload.int("role")?.unwrap_or_default();
    let role = assignable_role(&state.pool, &group, role_id, own_role.as_ref()).await?;
    require_outranks(&state.pool, &group, profile_id, own_role.as_ref()).await?;

    if !Membership::set_role(&state.pool, group.id, profile_id, role.id, auth_user.user_id()).await? {
        return Err(ApiError::not_found("Membership not found."));
    }
    let membership = Membership::find(&state.pool, group.id, profile_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Membership not found."))?;
    info!("Profile {} promoted to {} in group {}", profile_id, role.name, group.id);

    Ok(ApiResponse::success(membership))
}

/// POST /api/groups/:id/members/:profile_id/delete/ - Managers remove anyone; members may leave
pub async fn remove(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, profile_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    let group = load_group(&state.pool, id).await?;
    if profile_id != auth_user.profile_id() {
        let own_role = require_member_manager(&state.pool, &auth_user, &group).await?;
        require_outranks(&state.pool, &group, profile_id, own_role.as_ref()).await?;
    }
    if !Membership::delete(&state.pool, group.id, profile_id).await? {
        return Err(ApiError::not_found("Membership not found."));
    }
    Ok(ApiResponse::detail("Member removed."))
}
