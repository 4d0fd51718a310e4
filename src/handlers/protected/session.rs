// handlers/protected/session.rs - POST /api/logout/ and GET /api/auth/me/

use axum::extract::State;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::auth;
use crate::database::models::UserSummary;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

#[derive(Debug, Serialize)]
pub struct Me {
    #[serde(flatten)]
    pub user: UserSummary,
    pub profile_id: i64,
    pub is_admin: bool,
    pub is_elder: bool,
}

/// GET /api/auth/me/ - The account behind the presented token
pub async fn me(auth_user: AuthUser) -> ApiResult<Me> {
    Ok(ApiResponse::success(Me {
        user: UserSummary::from(&auth_user.user),
        profile_id: auth_user.profile.id,
        is_admin: auth_user.profile.is_admin,
        is_elder: auth_user.profile.is_elder,
    }))
}

/// POST /api/logout/ - Revoke the presented token
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Detail> {
    auth::revoke(&state.pool, &auth_user.token).await?;
    info!("User {} logged out", auth_user.user.username);
    Ok(ApiResponse::detail("Logged out."))
}
