use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// Communiques and notices share one table, told apart by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementKind {
    Communique,
    Notice,
}

impl AnnouncementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementKind::Communique => "communique",
            AnnouncementKind::Notice => "notice",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnnouncementKind::Communique => "Communique",
            AnnouncementKind::Notice => "Notice",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: i64,
    pub church_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementDetail {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub recipients: Vec<i64>,
}

const ANNOUNCEMENT_COLUMNS: &str = "a.id, a.church_id, a.kind, a.title, a.message, a.sent_at";

impl Announcement {
    pub async fn find(pool: &SqlitePool, kind: AnnouncementKind, id: i64) -> Result<Option<Announcement>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a WHERE a.id = ? AND a.kind = ?"
        ))
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(pool)
        .await
    }

    pub async fn list_all(pool: &SqlitePool, kind: AnnouncementKind, limit: i64) -> Result<Vec<Announcement>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a
             WHERE a.kind = ?
             ORDER BY a.sent_at DESC, a.id DESC
             LIMIT ?"
        ))
        .bind(kind.as_str())
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    /// Announcements of the profile's churches or addressed to it directly
    pub async fn list_visible_to(
        pool: &SqlitePool,
        kind: AnnouncementKind,
        profile_id: i64,
        limit: i64,
    ) -> Result<Vec<Announcement>, sqlx::Error> {
        sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a
             WHERE a.kind = ?1
               AND (a.church_id IN (SELECT church_id FROM profile_churches WHERE profile_id = ?2)
                    OR a.id IN (SELECT announcement_id FROM announcement_recipients WHERE profile_id = ?2))
             ORDER BY a.sent_at DESC, a.id DESC
             LIMIT ?3"
        ))
        .bind(kind.as_str())
        .bind(profile_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn is_visible_to(pool: &SqlitePool, id: i64, profile_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM announcements a
             WHERE a.id = ?1
               AND (a.church_id IN (SELECT church_id FROM profile_churches WHERE profile_id = ?2)
                    OR EXISTS (SELECT 1 FROM announcement_recipients r
                                WHERE r.announcement_id = a.id AND r.profile_id = ?2))",
        )
        .bind(id)
        .bind(profile_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO announcements (church_id, kind, title, message, sent_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(&self.kind)
        .bind(&self.title)
        .bind(&self.message)
        .bind(self.sent_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE announcements SET church_id = ?, title = ?, message = ? WHERE id = ?")
            .bind(self.church_id)
            .bind(&self.title)
            .bind(&self.message)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn recipients(pool: &SqlitePool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT profile_id FROM announcement_recipients WHERE announcement_id = ? ORDER BY profile_id",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    /// Replace the recipient list
    pub async fn set_recipients(pool: &SqlitePool, id: i64, profile_ids: &[i64]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM announcement_recipients WHERE announcement_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for profile_id in profile_ids {
            sqlx::query("INSERT OR IGNORE INTO announcement_recipients (announcement_id, profile_id) VALUES (?, ?)")
                .bind(id)
                .bind(profile_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    pub async fn into_detail(self, pool: &SqlitePool) -> Result<AnnouncementDetail, sqlx::Error> {
        let recipients = Self::recipients(pool, self.id).await?;
        Ok(AnnouncementDetail { announcement: self, recipients })
    }
}
