// handlers/protected/churches.rs - /api/churches/ (alias /api/igrejas/)
//
// Church records, their weekly operating hours and dated exceptions.
// Creating and deleting churches is reserved to administrators; church
// staff maintain the rest.

use axum::extract::{Query, State};
use chrono::{NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::api::{ListQuery, Path, Payload};
use crate::app::AppState;
use crate::auth::access;
use crate::database::models::{Church, OperatingException, OperatingHour, OperatingHourView};
use crate::error::ApiError;
use crate::handlers::public::church::ChurchOverview;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Detail};

async fn load_church(pool: &SqlitePool, auth_user: &AuthUser, id: i64) -> Result<Church, ApiError> {
    match Church::find(pool, id).await? {
        Some(church) if church.is_active || auth_user.is_elevated() => Ok(church),
        _ => Err(ApiError::not_found("Church not found.")),
    }
}

/// GET /api/churches/ - Active churches; elevated callers also see inactive ones
pub async fn list(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Vec<Church>> {
    let churches = Church::list(&state.pool, auth_user.is_elevated()).await?;
    Ok(ApiResponse::success(churches))
}

/// GET /api/churches/:id/
pub async fn detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ChurchOverview> {
    let church = load_church(&state.pool, &auth_user, id).await?;
    Ok(ApiResponse::success(ChurchOverview::load(&state.pool, church).await?))
}

/// POST /api/churches/create/ - Administrators only
pub async fn create(State(state): State<AppState>, auth_user: AuthUser, payload: Payload) -> ApiResult<Church> {
    access::require_admin(&auth_user)?;
    payload.require(&["name"])?;

    let now = Utc::now();
    let mut church = Church {
        id: 0,
        name: payload.string("name")?.unwrap_or_default(),
        description: payload.text("description")?.unwrap_or_default(),
        address: payload.text("address")?.unwrap_or_default(),
        phone: payload.text("phone")?.unwrap_or_default(),
        email: payload.string("email")?.unwrap_or_default(),
        timezone: payload.string("timezone")?.unwrap_or_else(|| "UTC".to_string()),
        is_active: payload.bool("is_active")?.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    church.id = church.insert(&state.pool).await?;
    info!("Church {} created by {}", church.id, auth_user.user.username);

    Ok(ApiResponse::created(church))
}

/// POST /api/churches/:id/update/ - Church staff; only supplied fields change
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<Church> {
    let mut church = load_church(&state.pool, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, church.id).await?;

    if payload.has("name") {
        payload.require(&["name"])?;
        church.name = payload.string("name")?.unwrap_or_default();
    }
    if let Some(description) = payload.text("description")? {
        church.description = description;
    }
    if let Some(address) = payload.text("address")? {
        church.address = address;
    }
    if let Some(phone) = payload.text("phone")? {
        church.phone = phone;
    }
    if let Some(email) = payload.text("email")? {
        church.email = email.trim().to_string();
    }
    if let Some(timezone) = payload.string("timezone")? {
        church.timezone = timezone;
    }
    if let Some(is_active) = payload.bool("is_active")? {
        church.is_active = is_active;
    }
    church.updated_at = Utc::now();
    church.save(&state.pool).await?;

    Ok(ApiResponse::success(church))
}

/// POST /api/churches/:id/delete/ - Administrators only; cascades to everything the church owns
pub async fn delete(State(state): State<AppState>, auth_user: AuthUser, Path(id): Path<i64>) -> ApiResult<Detail> {
    access::require_admin(&auth_user)?;
    if !Church::delete(&state.pool, id).await? {
        return Err(ApiError::not_found("Church not found."));
    }
    info!("Church {} deleted by {}", id, auth_user.user.username);
    Ok(ApiResponse::detail("Church deleted."))
}

/// Open days need both times, in order
fn check_schedule(is_closed: bool, opens_at: Option<NaiveTime>, closes_at: Option<NaiveTime>) -> Result<(), ApiError> {
    if is_closed {
        return Ok(());
    }
    match (opens_at, closes_at) {
        (Some(opens), Some(closes)) if closes > opens => Ok(()),
        (Some(_), Some(_)) => Err(ApiError::invalid_field("closes_at", "closes_at must be after opens_at.")),
        (opens, _) => {
            let field = if opens.is_none() { "opens_at" } else { "closes_at" };
            Err(ApiError::invalid_field(field, "Opening and closing times are required unless closed."))
        }
    }
}

/// GET /api/churches/:id/hours/
pub async fn hours(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<OperatingHourView>> {
    let church = load_church(&state.pool, &auth_user, id).await?;
    let hours = OperatingHour::list_for_church(&state.pool, church.id)
        .await?
        .into_iter()
        .map(OperatingHour::into_view)
        .collect();
    Ok(ApiResponse::success(hours))
}

/// POST /api/churches/:id/hours/ - `day_of_week` 0 (Monday) to 6 (Sunday)
pub async fn add_hour(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<OperatingHourView> {
    let church = load_church(&state.pool, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, church.id).await?;
    payload.require(&["day_of_week"])?;

    let day_of_week = payload.int("day_of_week")?.unwrap_or_default();
    if !(0..=6).contains(&day_of_week) {
        return Err(ApiError::invalid_field("day_of_week", "day_of_week must be between 0 and 6."));
    }
    let is_closed = payload.bool("is_closed")?.unwrap_or(false);
    let opens_at = payload.time("opens_at")?;
    let closes_at = payload.time("closes_at")?;
    check_schedule(is_closed, opens_at, closes_at)?;

    let mut hour = OperatingHour {
        id: 0,
        church_id: church.id,
        day_of_week,
        opens_at,
        closes_at,
        is_closed,
        notes: payload.text("notes")?.unwrap_or_default(),
    };
    hour.id = hour.insert(&state.pool).await?;
    Ok(ApiResponse::created(hour.into_view()))
}

/// POST /api/churches/:id/hours/:hour_id/delete/
pub async fn delete_hour(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, hour_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    access::require_church_staff(&state.pool, &auth_user, id).await?;
    if !OperatingHour::delete(&state.pool, id, hour_id).await? {
        return Err(ApiError::not_found("Operating hour not found."));
    }
    Ok(ApiResponse::detail("Operating hour deleted."))
}

/// GET /api/churches/:id/exceptions/?limit= - Most recent first
pub async fn exceptions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OperatingException>> {
    let church = load_church(&state.pool, &auth_user, id).await?;
    let limit = query.limit(state.default_limit());
    let exceptions = OperatingException::list_for_church(&state.pool, church.id, limit).await?;
    Ok(ApiResponse::success(exceptions))
}

/// POST /api/churches/:id/exceptions/
pub async fn add_exception(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i64>,
    payload: Payload,
) -> ApiResult<OperatingException> {
    let church = load_church(&state.pool, &auth_user, id).await?;
    access::require_church_staff(&state.pool, &auth_user, church.id).await?;
    payload.require(&["date"])?;

    let is_closed = payload.bool("is_closed")?.unwrap_or(false);
    let opens_at = payload.time("opens_at")?;
    let closes_at = payload.time("closes_at")?;
    check_schedule(is_closed, opens_at, closes_at)?;

    let mut exception = OperatingException {
        id: 0,
        church_id: church.id,
        date: payload
            .date("date")?
            .ok_or_else(|| ApiError::invalid_field("date", "date is required."))?,
        opens_at,
        closes_at,
        is_closed,
        reason: payload.text("reason")?.unwrap_or_default(),
    };
    exception.id = exception.insert(&state.pool).await?;
    Ok(ApiResponse::created(exception))
}

/// POST /api/churches/:id/exceptions/:exception_id/delete/
pub async fn delete_exception(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, exception_id)): Path<(i64, i64)>,
) -> ApiResult<Detail> {
    access::require_church_staff(&state.pool, &auth_user, id).await?;
    if !OperatingException::delete(&state.pool, id, exception_id).await? {
        return Err(ApiError::not_found("Operating exception not found."));
    }
    Ok(ApiResponse::detail("Operating exception deleted."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn closed_days_need_no_times() {
        assert!(check_schedule(true, None, None).is_ok());
    }

    #[test]
    fn closing_must_follow_opening() {
        assert!(check_schedule(false, at(9, 0), at(12, 0)).is_ok());
        let err = check_schedule(false, at(12, 0), at(9, 0)).unwrap_err();
        assert_eq!(err.to_json()["fields"][0], "closes_at");
        let err = check_schedule(false, None, at(9, 0)).unwrap_err();
        assert_eq!(err.to_json()["fields"][0], "opens_at");
    }
}
