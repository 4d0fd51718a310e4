// handlers/protected/staff.rs - /api/churches/:id/staff/

use axum::extract::State;
use tracing::info;

use crate::api::{Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Church, ChurchStaff, User, STAFF_ROLES};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

/// GET /api/churches/:id/staff/ - Visible to the church's own staff
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(church_id): Path<i64>,
) -> ApiResult<Vec<ChurchStaff>> {
    access::require_church_staff(&state.pool, &auth_user, church_id).await?;
    let staff = ChurchStaff::list_for_church(&state.pool, church_id).await?;
    Ok(ApiResponse::success(staff))
}

/// POST /api/churches/:id/staff/ - Administrators assign `user` a `role`.
/// Assigning an existing staff member replaces their role.
pub async fn assign(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(church_id): Path<i64>,
    payload: Payload,
) -> ApiResult<ChurchStaff> {
    access::require_admin(&auth_user)?;
    payload.require(&["user", "role"])?;

    if !Church::exists(&state.pool, church_id).await? {
        return Err(ApiError::not_found("Church not found."));
    }
    let user_id = payload.int("user")?.unwrap_or_default();
    if User::find(&state.pool, user_id).await?.is_none() {
        return Err(ApiError::invalid_field("user", format!("User {user_id} does not exist.")));
    }
    let role = payload.string("role")?.unwrap_or_default().to_uppercase();
    if !STAFF_ROLES.contains(&role.as_str()) {
        return Err(ApiError::invalid_field(
            "role",
            format!("role must be one of {}.", STAFF_ROLES.join(", ")),
        ));
    }
    let is_active = payload.bool("is_active")?.unwrap_or(true);

    let existed = ChurchStaff::find(&state.pool, church_id, user_id).await?.is_some();
    ChurchStaff::upsert(&state.pool, church_id, user_id, &role, is_active, Some(auth_user.user_id())).await?;
    let staff = ChurchStaff::find(&state.pool, church_id, user_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Staff record vanished after write"))?;
    info!("User {} is now {} of church {}", user_id, role, church_id);

    Ok(if existed {
        ApiResponse::success(staff)
    } else {
        ApiResponse::created(staff)
    })
}

/// POST /api/churches/:id/staff/:user_id/delete/
pub async fn remove(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((church_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    access::require_admin(&auth_user)?;
    if !ChurchStaff::delete(&state.pool, church_id, user_id).await? {
        return Err(ApiError::not_found("Staff member not found."));
    }
    Ok(ApiResponse::detail("Staff member removed."))
}
