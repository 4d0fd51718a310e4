// handlers/public/events.rs - Published event listings

use axum::extract::{Query, State};
use chrono::Utc;

use crate::api::ListQuery;
use crate::app::AppState;
use crate::database::models::{Event, EventUpdate};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/events/upcoming/?limit= - Published events that have not ended, soonest first
pub async fn upcoming(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Event>> {
    let limit = query.limit(state.default_limit());
    let events = Event::upcoming(&state.pool, Utc::now(), limit).await?;
    Ok(ApiResponse::success(events))
}

/// GET /api/event-updates/?limit= - Published updates, newest first
pub async fn published_updates(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<EventUpdate>> {
    let limit = query.limit(state.default_limit());
    let updates = EventUpdate::list_published(&state.pool, limit).await?;
    Ok(ApiResponse::success(updates))
}
