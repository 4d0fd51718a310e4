use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// A team inside a church
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub church_id: i64,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

const GROUP_COLUMNS: &str = "g.id, g.church_id, g.name, g.description, g.is_active, g.created_by, g.created_at";

impl Group {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM church_groups g WHERE g.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(pool: &SqlitePool, church_id: i64, name: &str) -> Result<Option<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM church_groups g WHERE g.church_id = ? AND g.name = ?"
        ))
        .bind(church_id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Every group, optionally narrowed to one church
    pub async fn list(pool: &SqlitePool, church_id: Option<i64>) -> Result<Vec<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM church_groups g
             WHERE (?1 IS NULL OR g.church_id = ?1)
             ORDER BY g.name"
        ))
        .bind(church_id)
        .fetch_all(pool)
        .await
    }

    /// Groups where the profile holds an active membership
    pub async fn list_for_member(
        pool: &SqlitePool,
        profile_id: i64,
        church_id: Option<i64>,
    ) -> Result<Vec<Group>, sqlx::Error> {
        sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM church_groups g
             JOIN group_memberships m ON m.group_id = g.id
             WHERE m.profile_id = ?1 AND m.is_active = 1
               AND (?2 IS NULL OR g.church_id = ?2)
             ORDER BY g.name"
        ))
        .bind(profile_id)
        .bind(church_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO church_groups (church_id, name, description, is_active, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.is_active)
        .bind(self.created_by)
        .bind(self.created_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE church_groups SET name = ?, description = ?, is_active = ? WHERE id = ?")
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.is_active)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM church_groups WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupRole {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub rank: i64,
    pub can_manage_chat: bool,
    pub can_promote_members: bool,
}

const ROLE_COLUMNS: &str = "id, group_id, name, rank, can_manage_chat, can_promote_members";

impl GroupRole {
    pub async fn find(pool: &SqlitePool, group_id: i64, id: i64) -> Result<Option<GroupRole>, sqlx::Error> {
        sqlx::query_as::<_, GroupRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM group_roles WHERE id = ? AND group_id = ?"
        ))
        .bind(id)
        .bind(group_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_group(pool: &SqlitePool, group_id: i64) -> Result<Vec<GroupRole>, sqlx::Error> {
        sqlx::query_as::<_, GroupRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM group_roles WHERE group_id = ? ORDER BY rank DESC, name"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// Role held through the profile's active membership, if any
    pub async fn for_member(pool: &SqlitePool, group_id: i64, profile_id: i64) -> Result<Option<GroupRole>, sqlx::Error> {
        sqlx::query_as::<_, GroupRole>(
            "SELECT r.id, r.group_id, r.name, r.rank, r.can_manage_chat, r.can_promote_members
             FROM group_memberships m
             JOIN group_roles r ON r.id = m.role_id
             WHERE m.group_id = ? AND m.profile_id = ? AND m.is_active = 1",
        )
        .bind(group_id)
        .bind(profile_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO group_roles (group_id, name, rank, can_manage_chat, can_promote_members)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.group_id)
        .bind(&self.name)
        .bind(self.rank)
        .bind(self.can_manage_chat)
        .bind(self.can_promote_members)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(pool: &SqlitePool, group_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_roles WHERE id = ? AND group_id = ?")
            .bind(id)
            .bind(group_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Membership row joined with the member's name and role
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub id: i64,
    pub group_id: i64,
    pub profile_id: i64,
    pub username: String,
    pub name: String,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub promoted_by: Option<i64>,
    pub promoted_at: Option<DateTime<Utc>>,
}

const MEMBERSHIP_SELECT: &str = "SELECT m.id, m.group_id, m.profile_id, u.username, u.first_name AS name,
        m.role_id, r.name AS role_name, m.is_active, m.joined_at, m.promoted_by, m.promoted_at
   FROM group_memberships m
   JOIN profiles p ON p.id = m.profile_id
   JOIN users u ON u.id = p.user_id
   LEFT JOIN group_roles r ON r.id = m.role_id";

impl Membership {
    pub async fn list_for_group(pool: &SqlitePool, group_id: i64) -> Result<Vec<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "{MEMBERSHIP_SELECT} WHERE m.group_id = ? ORDER BY r.rank DESC, u.first_name, u.username"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &SqlitePool, group_id: i64, profile_id: i64) -> Result<Option<Membership>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!("{MEMBERSHIP_SELECT} WHERE m.group_id = ? AND m.profile_id = ?"))
            .bind(group_id)
            .bind(profile_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn is_active_member(pool: &SqlitePool, group_id: i64, profile_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = ? AND profile_id = ? AND is_active = 1",
        )
        .bind(group_id)
        .bind(profile_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Add the profile to the group, reactivating an old membership if one exists
    pub async fn upsert(
        pool: &SqlitePool,
        group_id: i64,
        profile_id: i64,
        role_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO group_memberships (group_id, profile_id, role_id, is_active, joined_at)
             VALUES (?, ?, ?, 1, ?)
             ON CONFLICT (group_id, profile_id)
             DO UPDATE SET is_active = 1, role_id = COALESCE(excluded.role_id, group_memberships.role_id)",
        )
        .bind(group_id)
        .bind(profile_id)
        .bind(role_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_role(
        pool: &SqlitePool,
        group_id: i64,
        profile_id: i64,
        role_id: i64,
        promoted_by: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE group_memberships SET role_id = ?, promoted_by = ?, promoted_at = ?
             WHERE group_id = ? AND profile_id = ?",
        )
        .bind(role_id)
        .bind(promoted_by)
        .bind(Utc::now())
        .bind(group_id)
        .bind(profile_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &SqlitePool, group_id: i64, profile_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_memberships WHERE group_id = ? AND profile_id = ?")
            .bind(group_id)
            .bind(profile_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Profiles with an active membership
    pub async fn active_profile_ids(pool: &SqlitePool, group_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT profile_id FROM group_memberships WHERE group_id = ? AND is_active = 1")
            .bind(group_id)
            .fetch_all(pool)
            .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub group_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

const CHAT_SELECT: &str = "SELECT c.id, c.group_id, c.author_id,
        CASE WHEN u.first_name = '' THEN u.username ELSE u.first_name END AS author_name,
        c.content, c.created_at, c.edited_at
   FROM group_chat_messages c
   JOIN profiles p ON p.id = c.author_id
   JOIN users u ON u.id = p.user_id";

impl ChatMessage {
    /// Oldest first, keeping only the newest `limit` messages when it is positive
    pub async fn list_for_group(pool: &SqlitePool, group_id: i64, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "{CHAT_SELECT} WHERE c.group_id = ? ORDER BY c.created_at DESC, c.id DESC LIMIT ?"
        ))
        .bind(group_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn find(pool: &SqlitePool, group_id: i64, id: i64) -> Result<Option<ChatMessage>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!("{CHAT_SELECT} WHERE c.id = ? AND c.group_id = ?"))
            .bind(id)
            .bind(group_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(pool: &SqlitePool, group_id: i64, author_id: i64, content: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO group_chat_messages (group_id, author_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(author_id)
        .bind(content)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn edit(pool: &SqlitePool, id: i64, content: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE group_chat_messages SET content = ?, edited_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_chat_messages WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
