use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// Direct message between two profiles
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PrivateMessage {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub recipient_id: i64,
    pub recipient_name: String,
    pub content: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.sender_id,
        CASE WHEN su.first_name = '' THEN su.username ELSE su.first_name END AS sender_name,
        m.recipient_id,
        CASE WHEN ru.first_name = '' THEN ru.username ELSE ru.first_name END AS recipient_name,
        m.content, m.is_read, m.sent_at
   FROM private_messages m
   JOIN profiles sp ON sp.id = m.sender_id
   JOIN users su ON su.id = sp.user_id
   JOIN profiles rp ON rp.id = m.recipient_id
   JOIN users ru ON ru.id = rp.user_id";

impl PrivateMessage {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<PrivateMessage>, sqlx::Error> {
        sqlx::query_as::<_, PrivateMessage>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Messages the profile sent or received, newest first
    pub async fn list_for_profile(
        pool: &SqlitePool,
        profile_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<PrivateMessage>, sqlx::Error> {
        sqlx::query_as::<_, PrivateMessage>(&format!(
            "{MESSAGE_SELECT}
             WHERE (m.sender_id = ?1 OR m.recipient_id = ?1)
               AND (?2 = 0 OR (m.is_read = 0 AND m.recipient_id = ?1))
             ORDER BY m.sent_at DESC, m.id DESC
             LIMIT ?3"
        ))
        .bind(profile_id)
        .bind(unread_only)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(pool: &SqlitePool, sender_id: i64, recipient_id: i64, content: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO private_messages (sender_id, recipient_id, content, is_read, sent_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(content)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE private_messages SET content = ?, is_read = ? WHERE id = ?")
            .bind(&self.content)
            .bind(self.is_read)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM private_messages WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub fn involves(&self, profile_id: i64) -> bool {
        self.sender_id == profile_id || self.recipient_id == profile_id
    }
}
