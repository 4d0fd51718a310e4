use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Church {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CHURCH_COLUMNS: &str =
    "id, name, description, address, phone, email, timezone, is_active, created_at, updated_at";

impl Church {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Church>, sqlx::Error> {
        sqlx::query_as::<_, Church>(&format!("SELECT {CHURCH_COLUMNS} FROM churches WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The church the public landing endpoint describes: the oldest active one
    pub async fn primary(pool: &SqlitePool) -> Result<Option<Church>, sqlx::Error> {
        sqlx::query_as::<_, Church>(&format!(
            "SELECT {CHURCH_COLUMNS} FROM churches WHERE is_active = 1 ORDER BY id LIMIT 1"
        ))
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &SqlitePool, include_inactive: bool) -> Result<Vec<Church>, sqlx::Error> {
        sqlx::query_as::<_, Church>(&format!(
            "SELECT {CHURCH_COLUMNS} FROM churches WHERE (?1 OR is_active = 1) ORDER BY name"
        ))
        .bind(include_inactive)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Church>, sqlx::Error> {
        sqlx::query_as::<_, Church>(&format!("SELECT {CHURCH_COLUMNS} FROM churches WHERE name = ?"))
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO churches (name, description, address, phone, email, timezone, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.address)
        .bind(&self.phone)
        .bind(&self.email)
        .bind(&self.timezone)
        .bind(self.is_active)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE churches SET name = ?, description = ?, address = ?, phone = ?, email = ?,
                    timezone = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.address)
        .bind(&self.phone)
        .bind(&self.email)
        .bind(&self.timezone)
        .bind(self.is_active)
        .bind(self.updated_at)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM churches WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM churches WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }
}

/// Times go over the wire as `HH:MM`
fn serialize_hhmm<S: Serializer>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OperatingHour {
    pub id: i64,
    pub church_id: i64,
    pub day_of_week: i64,
    #[serde(serialize_with = "serialize_hhmm")]
    pub opens_at: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub closes_at: Option<NaiveTime>,
    pub is_closed: bool,
    pub notes: String,
}

/// Operating hour with its weekday name
#[derive(Debug, Clone, Serialize)]
pub struct OperatingHourView {
    #[serde(flatten)]
    pub hour: OperatingHour,
    pub day_label: &'static str,
}

const DAY_LABELS: [&str; 7] = ["Segunda", "Terca", "Quarta", "Quinta", "Sexta", "Sabado", "Domingo"];

impl OperatingHour {
    pub fn day_label(day_of_week: i64) -> &'static str {
        usize::try_from(day_of_week)
            .ok()
            .and_then(|day| DAY_LABELS.get(day).copied())
            .unwrap_or("Dia")
    }

    pub fn into_view(self) -> OperatingHourView {
        let day_label = Self::day_label(self.day_of_week);
        OperatingHourView { hour: self, day_label }
    }

    pub async fn list_for_church(pool: &SqlitePool, church_id: i64) -> Result<Vec<OperatingHour>, sqlx::Error> {
        sqlx::query_as::<_, OperatingHour>(
            "SELECT id, church_id, day_of_week, opens_at, closes_at, is_closed, notes
             FROM operating_hours WHERE church_id = ?
             ORDER BY day_of_week, opens_at",
        )
        .bind(church_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO operating_hours (church_id, day_of_week, opens_at, closes_at, is_closed, notes)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(self.day_of_week)
        .bind(self.opens_at)
        .bind(self.closes_at)
        .bind(self.is_closed)
        .bind(&self.notes)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(pool: &SqlitePool, church_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operating_hours WHERE id = ? AND church_id = ?")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OperatingException {
    pub id: i64,
    pub church_id: i64,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_hhmm")]
    pub opens_at: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub closes_at: Option<NaiveTime>,
    pub is_closed: bool,
    pub reason: String,
}

impl OperatingException {
    /// Most recent first; `limit` of 0 returns everything
    pub async fn list_for_church(
        pool: &SqlitePool,
        church_id: i64,
        limit: i64,
    ) -> Result<Vec<OperatingException>, sqlx::Error> {
        sqlx::query_as::<_, OperatingException>(
            "SELECT id, church_id, date, opens_at, closes_at, is_closed, reason
             FROM operating_exceptions WHERE church_id = ?
             ORDER BY date DESC
             LIMIT ?",
        )
        .bind(church_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO operating_exceptions (church_id, date, opens_at, closes_at, is_closed, reason)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(self.date)
        .bind(self.opens_at)
        .bind(self.closes_at)
        .bind(self.is_closed)
        .bind(&self.reason)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(pool: &SqlitePool, church_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operating_exceptions WHERE id = ? AND church_id = ?")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub const STAFF_ROLES: [&str; 3] = ["ELDER", "ADMIN", "STAFF"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChurchStaff {
    pub id: i64,
    pub church_id: i64,
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub added_by: Option<i64>,
    pub added_at: DateTime<Utc>,
}

const STAFF_SELECT: &str = "SELECT s.id, s.church_id, s.user_id, u.username, u.first_name AS name,
        s.role, s.is_active, s.added_by, s.added_at
   FROM church_staff s
   JOIN users u ON u.id = s.user_id";

impl ChurchStaff {
    pub async fn list_for_church(pool: &SqlitePool, church_id: i64) -> Result<Vec<ChurchStaff>, sqlx::Error> {
        sqlx::query_as::<_, ChurchStaff>(&format!("{STAFF_SELECT} WHERE s.church_id = ? ORDER BY s.role, u.username"))
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &SqlitePool, church_id: i64, user_id: i64) -> Result<Option<ChurchStaff>, sqlx::Error> {
        sqlx::query_as::<_, ChurchStaff>(&format!("{STAFF_SELECT} WHERE s.church_id = ? AND s.user_id = ?"))
            .bind(church_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// One staff record per (church, user): a second assignment replaces the role
    pub async fn upsert(
        pool: &SqlitePool,
        church_id: i64,
        user_id: i64,
        role: &str,
        is_active: bool,
        added_by: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO church_staff (church_id, user_id, role, is_active, added_by, added_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (church_id, user_id)
             DO UPDATE SET role = excluded.role, is_active = excluded.is_active",
        )
        .bind(church_id)
        .bind(user_id)
        .bind(role)
        .bind(is_active)
        .bind(added_by)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, church_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM church_staff WHERE church_id = ? AND user_id = ?")
            .bind(church_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_labels_cover_the_week() {
        assert_eq!(OperatingHour::day_label(0), "Segunda");
        assert_eq!(OperatingHour::day_label(6), "Domingo");
        assert_eq!(OperatingHour::day_label(7), "Dia");
        assert_eq!(OperatingHour::day_label(-1), "Dia");
    }

    #[test]
    fn hours_serialize_as_hh_mm() {
        let hour = OperatingHour {
            id: 1,
            church_id: 1,
            day_of_week: 5,
            opens_at: NaiveTime::from_hms_opt(9, 0, 0),
            closes_at: None,
            is_closed: false,
            notes: String::new(),
        };
        let value = serde_json::to_value(hour.into_view()).unwrap();
        assert_eq!(value["opens_at"], "09:00");
        assert!(value["closes_at"].is_null());
        assert_eq!(value["day_label"], "Sabado");
    }
}
