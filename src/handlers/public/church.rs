// handlers/public/church.rs - GET /api/church/

use axum::extract::State;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::database::models::{Church, OperatingException, OperatingHour, OperatingHourView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const RECENT_EXCEPTIONS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct ChurchOverview {
    #[serde(flatten)]
    pub church: Church,
    pub operating_hours: Vec<OperatingHourView>,
    pub operating_exceptions: Vec<OperatingException>,
}

impl ChurchOverview {
    /// Weekly schedule plus the most recent exceptions
    pub async fn load(pool: &SqlitePool, church: Church) -> Result<Self, sqlx::Error> {
        let operating_hours = OperatingHour::list_for_church(pool, church.id)
            .await?
            .into_iter()
            .map(OperatingHour::into_view)
            .collect();
        let operating_exceptions = OperatingException::list_for_church(pool, church.id, RECENT_EXCEPTIONS).await?;
        Ok(Self {
            church,
            operating_hours,
            operating_exceptions,
        })
    }
}

/// GET /api/church/ - The primary church with its schedule
pub async fn detail(State(state): State<AppState>) -> ApiResult<ChurchOverview> {
    let church = Church::primary(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No active church configured."))?;

    Ok(ApiResponse::success(ChurchOverview::load(&state.pool, church).await?))
}
