use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
}

const ACTIVITY_COLUMNS: &str = "id, group_id, name, description, scheduled_at";

impl Activity {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Activity>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(&format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// `member_of` narrows the listing to the groups of one profile
    pub async fn list(
        pool: &SqlitePool,
        member_of: Option<i64>,
        group_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities
             WHERE (?1 IS NULL OR group_id IN
                      (SELECT group_id FROM group_memberships WHERE profile_id = ?1 AND is_active = 1))
               AND (?2 IS NULL OR group_id = ?2)
             ORDER BY scheduled_at
             LIMIT ?3"
        ))
        .bind(member_of)
        .bind(group_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO activities (group_id, name, description, scheduled_at) VALUES (?, ?, ?, ?)",
        )
        .bind(self.group_id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.scheduled_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE activities SET group_id = ?, name = ?, description = ?, scheduled_at = ? WHERE id = ?")
            .bind(self.group_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.scheduled_at)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupNotification {
    pub id: i64,
    pub group_id: i64,
    pub profile_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

const NOTIFICATION_COLUMNS: &str = "id, group_id, profile_id, message, is_read, created_at";

impl GroupNotification {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<GroupNotification>, sqlx::Error> {
        sqlx::query_as::<_, GroupNotification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM group_notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest first; `profile_id` of `None` lists everyone's
    pub async fn list(
        pool: &SqlitePool,
        profile_id: Option<i64>,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<GroupNotification>, sqlx::Error> {
        sqlx::query_as::<_, GroupNotification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM group_notifications
             WHERE (?1 IS NULL OR profile_id = ?1)
               AND (?2 = 0 OR is_read = 0)
             ORDER BY created_at DESC, id DESC
             LIMIT ?3"
        ))
        .bind(profile_id)
        .bind(unread_only)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(pool: &SqlitePool, group_id: i64, profile_id: i64, message: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO group_notifications (group_id, profile_id, message, is_read, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(group_id)
        .bind(profile_id)
        .bind(message)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// One notification per active member of the group
    pub async fn broadcast(pool: &SqlitePool, group_id: i64, message: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO group_notifications (group_id, profile_id, message, is_read, created_at)
             SELECT group_id, profile_id, ?, 0, ? FROM group_memberships
             WHERE group_id = ? AND is_active = 1",
        )
        .bind(message)
        .bind(Utc::now())
        .bind(group_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE group_notifications SET message = ?, is_read = ? WHERE id = ?")
            .bind(&self.message)
            .bind(self.is_read)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_notifications WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
