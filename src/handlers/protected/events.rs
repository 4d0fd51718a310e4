// handlers/protected/events.rs - /api/events/
//
// Everyone sees published events. Staff of an event's church also see its
// drafts, participants and unpublished updates.

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{
    Church, Event, EventDetail, EventScope, EventUpdate, Participation, ATTENDANCE_MODES, PARTICIPATION_STATUSES,
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

/// Drafts are reported as missing to anyone outside the church staff
async fn load_visible_event(state: &AppState, auth_user: &AuthUser, id: i64) -> Result<(Event, bool), ApiError> {
    let event = Event::find(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found."))?;
    let is_staff = access::is_church_staff(&state.pool, auth_user, event.church_id).await?;
    if !event.is_published && !is_staff {
        return Err(ApiError::not_found("Event not found."));
    }
    Ok((event, is_staff))
}

fn check_period(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ApiError> {
    if ends_at <= starts_at {
        return Err(ApiError::invalid_field("ends_at", "ends_at must be after starts_at."));
    }
    Ok(())
}

fn check_attendance_mode(mode: &str) -> Result<(), ApiError> {
    if ATTENDANCE_MODES.contains(&mode) {
        Ok(())
    } else {
        Err(ApiError::invalid_field(
            "attendance_mode",
            format!("attendance_mode must be one of {}.", ATTENDANCE_MODES.join(", ")),
        ))
    }
}

fn check_capacity(capacity: Option<i64>) -> Result<(), ApiError> {
    match capacity {
        Some(capacity) if capacity < 0 => Err(ApiError::invalid_field("capacity", "capacity cannot be negative.")),
        _ => Ok(()),
    }
}

/// GET /api/events/?church=&limit=
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Event>> {
    let limit = query.limit(state.default_limit());
    let events = if auth_user.is_elevated() {
        Event::list(&state.pool, EventScope::All, query.church(), limit).await?
    } else {
        let staffed = access::staffed_church_ids(&state.pool, &auth_user).await?;
        Event::list(&state.pool, EventScope::StaffOf(&staffed), query.church(), limit).await?
    };
    Ok(ApiResponse::success(events))
}

/// GET /api/events/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<EventDetail> {
    let (event, _) = load_visible_event(&state, &auth_user, id).await?;
    Ok(ApiResponse::success(event.into_detail(&state.pool).await?))
}

/// POST /api/events/create/ - Church staff; `church`, `title`, `starts_at`, `ends_at` required
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<EventDetail> {
    payload.require(&["church", "title", "starts_at", "ends_at"])?;

    let church_id = payload.int("church")?.unwrap_or_default();
    if !Church::exists(&state.pool, church_id).await? {
        return Err(ApiError::invalid_field("church", format!("Church {church_id} does not exist.")));
    }
    access::require_church_staff(&state.pool, &auth_user, church_id).await?;

    let starts_at = payload
        .datetime("starts_at")?
        .ok_or_else(|| ApiError::invalid_field("starts_at", "starts_at is required."))?;
    let ends_at = payload
        .datetime("ends_at")?
        .ok_or_else(|| ApiError::invalid_field("ends_at", "ends_at is required."))?;
    check_period(starts_at, ends_at)?;

    let attendance_mode = payload
        .string("attendance_mode")?
        .map(|mode| mode.to_uppercase())
        .unwrap_or_else(|| ATTENDANCE_MODES[0].to_string());
    check_attendance_mode(&attendance_mode)?;
    let capacity = payload.int("capacity")?;
    check_capacity(capacity)?;

    let now = Utc::now();
    let mut event = Event {
        id: 0,
        church_id,
        title: payload.string("title")?.unwrap_or_default(),
        description: payload.text("description")?.unwrap_or_default(),
        speaker_name: payload.string("speaker_name")?.unwrap_or_default(),
        location: payload.string("location")?.unwrap_or_default(),
        starts_at,
        ends_at,
        image_url: payload.string("image_url")?.unwrap_or_default(),
        attendance_mode,
        created_by: Some(auth_user.user_id()),
        is_published: payload.bool("is_published")?.unwrap_or(true),
        capacity,
        created_at: now,
        updated_at: now,
    };
    event.id = event.insert(&state.pool).await?;
    info!("Event {} '{}' created by {}", event.id, event.title, auth_user.user.username);

    Ok(ApiResponse::created(event.into_detail(&state.pool).await?))
}

/// POST /api/events/:id/update/ - Church staff; only supplied fields change
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<EventDetail> {
    let (mut event, is_staff) = load_visible_event(&state, &auth_user, id).await?;
    if !is_staff {
        return Err(ApiError::forbidden("Only church staff can do this."));
    }

    if payload.has("title") {
        payload.require(&["title"])?;
        event.title = payload.string("title")?.unwrap_or_default();
    }
    if let Some(description) = payload.text("description")? {
        event.description = description;
    }
    if let Some(speaker_name) = payload.text("speaker_name")? {
        event.speaker_name = speaker_name.trim().to_string();
    }
    if let Some(location) = payload.text("location")? {
        event.location = location.trim().to_string();
    }
    if let Some(image_url) = payload.text("image_url")? {
        event.image_url = image_url.trim().to_string();
    }
    if let Some(starts_at) = payload.datetime("starts_at")? {
        event.starts_at = starts_at;
    }
    if let Some(ends_at) = payload.datetime("ends_at")? {
        event.ends_at = ends_at;
    }
    check_period(event.starts_at, event.ends_at)?;

    if let Some(mode) = payload.string("attendance_mode")? {
        let mode = mode.to_uppercase();
        check_attendance_mode(&mode)?;
        event.attendance_mode = mode;
    }
    if payload.has("capacity") {
        let capacity = payload.int("capacity")?;
        check_capacity(capacity)?;
        event.capacity = capacity;
    }
    if let Some(is_published) = payload.bool("is_published")? {
        event.is_published = is_published;
    }
    event.updated_at = Utc::now();
    event.save(&state.pool).await?;

    Ok(ApiResponse::success(event.into_detail(&state.pool).await?))
}

/// POST /api/events/:id/delete/
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    let (event, is_staff) = load_visible_event(&state, &auth_user, id).await?;
    if !is_staff {
        return Err(ApiError::forbidden("Only church staff can do this."));
    }
    Event::delete(&state.pool, event.id).await?;
    info!("Event {} deleted by {}", event.id, auth_user.user.username);
    Ok(ApiResponse::detail("Event deleted."))
}

/// POST /api/events/:id/confirm/ - Record the caller's answer (`status`, default CONFIRMED)
///
/// Confirming a full event is refused; changing an existing confirmation
/// to another status always succeeds.
pub async fn confirm(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Participation> {
    let event = match Event::find(&state.pool, id).await? {
        Some(event) if event.is_published => event,
        _ => return Err(ApiError::not_found("Event not found.")),
    };

    let status = payload
        .string("status")?
        .map(|status| status.to_uppercase())
        .unwrap_or_else(|| "CONFIRMED".to_string());
    if !PARTICIPATION_STATUSES.contains(&status.as_str()) {
        return Err(ApiError::invalid_field("status", "Invalid status value."));
    }

    let profile_id = auth_user.profile_id();
    let existing = Participation::find(&state.pool, event.id, profile_id).await?;
    let already_confirmed = existing.as_ref().is_some_and(|p| p.status == "CONFIRMED");
    if status == "CONFIRMED" && !already_confirmed {
        let confirmed = Event::confirmed_count(&state.pool, event.id).await?;
        if event.is_full(confirmed) {
            return Err(ApiError::bad_request("Event is full."));
        }
    }

    Participation::upsert(&state.pool, event.id, profile_id, &status).await?;
    let participation = Participation::find(&state.pool, event.id, profile_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Participation vanished after write"))?;
    info!("Profile {} answered {} for event {}", profile_id, status, event.id);

    if existing.is_some() {
        Ok(ApiResponse::success(participation))
    } else {
        Ok(ApiResponse::created(participation))
    }
}

/// GET /api/events/:id/participants/ - Church staff
pub async fn participants(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Participation>> {
    let (event, is_staff) = load_visible_event(&state, &auth_user, id).await?;
    if !is_staff {
        return Err(ApiError::forbidden("Only church staff can do this."));
    }
    Ok(ApiResponse::success(Participation::list_for_event(&state.pool, event.id).await?))
}

/// GET /api/events/:id/updates/ - Newest first; staff also see unpublished ones
pub async fn updates(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<EventUpdate>> {
    let (event, is_staff) = load_visible_event(&state, &auth_user, id).await?;
    Ok(ApiResponse::success(EventUpdate::list_for_event(&state.pool, event.id, is_staff).await?))
}

/// POST /api/events/:id/updates/ - Church staff; `title` and `content` required
pub async fn add_update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<EventUpdate> {
    let (event, is_staff) = load_visible_event(&state, &auth_user, id).await?;
    if !is_staff {
        return Err(ApiError::forbidden("Only church staff can do this."));
    }
    payload.require(&["title", "content"])?;

    let update_id = EventUpdate::insert(
        &state.pool,
        event.id,
        &payload.string("title")?.unwrap_or_default(),
        &payload.text("content")?.unwrap_or_default(),
        Some(auth_user.user_id()),
        payload.bool("is_published")?.unwrap_or(true),
    )
    .await?;
    let update = EventUpdate::find(&state.pool, update_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Event update vanished after write"))?;

    Ok(ApiResponse::created(update))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn events_must_end_after_they_start() {
        let start = Utc::now();
        assert!(check_period(start, start + Duration::hours(1)).is_ok());
        let err = check_period(start, start).unwrap_err();
        assert_eq!(err.to_json()["fields"][0], "ends_at");
        assert!(check_period(start, start - Duration::minutes(5)).is_err());
    }

    #[test]
    fn attendance_modes_and_capacity_are_checked() {
        assert!(check_attendance_mode("CONFIRM").is_ok());
        assert!(check_attendance_mode("PARTICIPATE").is_ok());
        assert!(check_attendance_mode("MAYBE").is_err());
        assert!(check_capacity(None).is_ok());
        assert!(check_capacity(Some(0)).is_ok());
        assert!(check_capacity(Some(-1)).is_err());
    }
}
