// handlers/protected/participations.rs - GET /api/participations/

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::ConfirmedEvent;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/participations/ - The caller's confirmed events, soonest first
pub async fn list(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Vec<ConfirmedEvent>> {
    let events = ConfirmedEvent::list_for_profile(&state.pool, auth_user.profile_id()).await?;
    Ok(ApiResponse::success(events))
}
