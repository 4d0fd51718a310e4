use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

pub const ATTENDANCE_MODES: [&str; 2] = ["CONFIRM", "PARTICIPATE"];
pub const PARTICIPATION_STATUSES: [&str; 3] = ["PENDING", "CONFIRMED", "CANCELLED"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub church_id: i64,
    pub title: String,
    pub description: String,
    pub speaker_name: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub image_url: String,
    pub attendance_mode: String,
    pub created_by: Option<i64>,
    pub is_published: bool,
    pub capacity: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event plus its confirmed attendance
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub confirmed_count: i64,
}

const EVENT_COLUMNS: &str = "id, church_id, title, description, speaker_name, location, starts_at, ends_at,
        image_url, attendance_mode, created_by, is_published, capacity, created_at, updated_at";

/// Which unpublished events a listing may include
#[derive(Debug, Clone)]
pub enum EventScope<'a> {
    /// Published events only
    Published,
    /// Everything
    All,
    /// Published events plus every event of these churches
    StaffOf(&'a [i64]),
}

impl Event {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Published events still running or yet to start, soonest first
    pub async fn upcoming(pool: &SqlitePool, now: DateTime<Utc>, limit: i64) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE is_published = 1 AND ends_at >= ?
             ORDER BY starts_at
             LIMIT ?"
        ))
        .bind(now)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        scope: EventScope<'_>,
        church_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let visibility = match &scope {
            EventScope::Published => "is_published = 1".to_string(),
            EventScope::All => "1 = 1".to_string(),
            EventScope::StaffOf(ids) if ids.is_empty() => "is_published = 1".to_string(),
            EventScope::StaffOf(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                format!("(is_published = 1 OR church_id IN ({placeholders}))")
            }
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE {visibility} AND (? IS NULL OR church_id = ?)
             ORDER BY starts_at
             LIMIT ?"
        );

        let mut query = sqlx::query_as::<_, Event>(&sql);
        if let EventScope::StaffOf(ids) = scope {
            for id in ids {
                query = query.bind(*id);
            }
        }
        query
            .bind(church_id)
            .bind(church_id)
            .bind(if limit > 0 { limit } else { -1 })
            .fetch_all(pool)
            .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO events (church_id, title, description, speaker_name, location, starts_at, ends_at,
                                 image_url, attendance_mode, created_by, is_published, capacity,
                                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.speaker_name)
        .bind(&self.location)
        .bind(self.starts_at)
        .bind(self.ends_at)
        .bind(&self.image_url)
        .bind(&self.attendance_mode)
        .bind(self.created_by)
        .bind(self.is_published)
        .bind(self.capacity)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE events SET church_id = ?, title = ?, description = ?, speaker_name = ?, location = ?,
                    starts_at = ?, ends_at = ?, image_url = ?, attendance_mode = ?, is_published = ?,
                    capacity = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(self.church_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.speaker_name)
        .bind(&self.location)
        .bind(self.starts_at)
        .bind(self.ends_at)
        .bind(&self.image_url)
        .bind(&self.attendance_mode)
        .bind(self.is_published)
        .bind(self.capacity)
        .bind(self.updated_at)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn confirmed_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM event_participations WHERE event_id = ? AND status = 'CONFIRMED'")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn into_detail(self, pool: &SqlitePool) -> Result<EventDetail, sqlx::Error> {
        let confirmed_count = Self::confirmed_count(pool, self.id).await?;
        Ok(EventDetail { event: self, confirmed_count })
    }

    pub fn is_full(&self, confirmed: i64) -> bool {
        matches!(self.capacity, Some(capacity) if confirmed >= capacity)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Participation {
    pub id: i64,
    pub event_id: i64,
    pub profile_id: i64,
    pub username: String,
    pub name: String,
    pub status: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const PARTICIPATION_SELECT: &str = "SELECT ep.id, ep.event_id, ep.profile_id, u.username, u.first_name AS name,
        ep.status, ep.confirmed_at, ep.created_at
   FROM event_participations ep
   JOIN profiles p ON p.id = ep.profile_id
   JOIN users u ON u.id = p.user_id";

impl Participation {
    pub async fn find(pool: &SqlitePool, event_id: i64, profile_id: i64) -> Result<Option<Participation>, sqlx::Error> {
        sqlx::query_as::<_, Participation>(&format!(
            "{PARTICIPATION_SELECT} WHERE ep.event_id = ? AND ep.profile_id = ?"
        ))
        .bind(event_id)
        .bind(profile_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_event(pool: &SqlitePool, event_id: i64) -> Result<Vec<Participation>, sqlx::Error> {
        sqlx::query_as::<_, Participation>(&format!(
            "{PARTICIPATION_SELECT} WHERE ep.event_id = ? ORDER BY ep.created_at"
        ))
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    /// Record the profile's answer; `confirmed_at` only tracks confirmations
    pub async fn upsert(pool: &SqlitePool, event_id: i64, profile_id: i64, status: &str) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let confirmed_at = (status == "CONFIRMED").then_some(now);
        sqlx::query(
            "INSERT INTO event_participations (event_id, profile_id, status, confirmed_at, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (event_id, profile_id)
             DO UPDATE SET status = excluded.status, confirmed_at = excluded.confirmed_at",
        )
        .bind(event_id)
        .bind(profile_id)
        .bind(status)
        .bind(confirmed_at)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// A confirmed participation together with the event it belongs to
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConfirmedEvent {
    pub participation_id: i64,
    pub event_id: i64,
    pub title: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl ConfirmedEvent {
    pub async fn list_for_profile(pool: &SqlitePool, profile_id: i64) -> Result<Vec<ConfirmedEvent>, sqlx::Error> {
        sqlx::query_as::<_, ConfirmedEvent>(
            "SELECT ep.id AS participation_id, e.id AS event_id, e.title, e.location, e.starts_at, e.ends_at,
                    ep.confirmed_at
             FROM event_participations ep
             JOIN events e ON e.id = ep.event_id
             WHERE ep.profile_id = ? AND ep.status = 'CONFIRMED'
             ORDER BY e.starts_at",
        )
        .bind(profile_id)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventUpdate {
    pub id: i64,
    pub event_id: i64,
    pub event_title: String,
    pub title: String,
    pub content: String,
    pub created_by: Option<i64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

const UPDATE_SELECT: &str = "SELECT eu.id, eu.event_id, e.title AS event_title, eu.title, eu.content,
        eu.created_by, eu.is_published, eu.created_at
   FROM event_updates eu
   JOIN events e ON e.id = eu.event_id";

impl EventUpdate {
    /// Published updates of published events, newest first
    pub async fn list_published(pool: &SqlitePool, limit: i64) -> Result<Vec<EventUpdate>, sqlx::Error> {
        sqlx::query_as::<_, EventUpdate>(&format!(
            "{UPDATE_SELECT} WHERE eu.is_published = 1 AND e.is_published = 1
             ORDER BY eu.created_at DESC, eu.id DESC
             LIMIT ?"
        ))
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_event(
        pool: &SqlitePool,
        event_id: i64,
        include_unpublished: bool,
    ) -> Result<Vec<EventUpdate>, sqlx::Error> {
        sqlx::query_as::<_, EventUpdate>(&format!(
            "{UPDATE_SELECT} WHERE eu.event_id = ?1 AND (?2 OR eu.is_published = 1)
             ORDER BY eu.created_at DESC, eu.id DESC"
        ))
        .bind(event_id)
        .bind(include_unpublished)
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<EventUpdate>, sqlx::Error> {
        sqlx::query_as::<_, EventUpdate>(&format!("{UPDATE_SELECT} WHERE eu.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(
        pool: &SqlitePool,
        event_id: i64,
        title: &str,
        content: &str,
        created_by: Option<i64>,
        is_published: bool,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO event_updates (event_id, title, content, created_by, is_published, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event_id)
        .bind(title)
        .bind(content)
        .bind(created_by)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(capacity: Option<i64>) -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            church_id: 1,
            title: "Culto".into(),
            description: String::new(),
            speaker_name: String::new(),
            location: String::new(),
            starts_at: now,
            ends_at: now,
            image_url: String::new(),
            attendance_mode: "CONFIRM".into(),
            created_by: None,
            is_published: true,
            capacity,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn capacity_limits_confirmations() {
        assert!(!sample(None).is_full(1_000));
        assert!(!sample(Some(2)).is_full(1));
        assert!(sample(Some(2)).is_full(2));
        assert!(sample(Some(0)).is_full(0));
    }
}
