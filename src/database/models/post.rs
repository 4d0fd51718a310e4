use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};

/// Group wall post. `poll` is free-form JSON supplied by the client.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub group_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub attachment: Option<String>,
    pub poll: Option<Json<Value>>,
    pub link: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Post with the public URL of its attachment
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub attachment_url: Option<String>,
}

const POST_SELECT: &str = "SELECT po.id, po.group_id, po.author_id,
        CASE WHEN u.first_name = '' THEN u.username ELSE u.first_name END AS author_name,
        po.content, po.attachment, po.poll, po.link, po.posted_at
   FROM posts po
   JOIN profiles p ON p.id = po.author_id
   JOIN users u ON u.id = p.user_id";

impl Post {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE po.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first. `member_of` narrows to the groups of one profile.
    pub async fn list(
        pool: &SqlitePool,
        member_of: Option<i64>,
        group_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT}
             WHERE (?1 IS NULL OR po.group_id IN
                      (SELECT group_id FROM group_memberships WHERE profile_id = ?1 AND is_active = 1))
               AND (?2 IS NULL OR po.group_id = ?2)
             ORDER BY po.posted_at DESC, po.id DESC
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
            "INSERT INTO posts (group_id, author_id, content, attachment, poll, link, posted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.group_id)
        .bind(self.author_id)
        .bind(&self.content)
        .bind(&self.attachment)
        .bind(&self.poll)
        .bind(&self.link)
        .bind(self.posted_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE posts SET content = ?, attachment = ?, poll = ?, link = ? WHERE id = ?")
            .bind(&self.content)
            .bind(&self.attachment)
            .bind(&self.poll)
            .bind(&self.link)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub group_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, po.group_id, c.author_id,
        CASE WHEN u.first_name = '' THEN u.username ELSE u.first_name END AS author_name,
        c.content, c.created_at
   FROM comments c
   JOIN posts po ON po.id = c.post_id
   JOIN profiles p ON p.id = c.author_id
   JOIN users u ON u.id = p.user_id";

impl Comment {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Oldest first, restricted to posts of groups the profile belongs to when `member_of` is set
    pub async fn list(
        pool: &SqlitePool,
        member_of: Option<i64>,
        post_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT}
             WHERE (?1 IS NULL OR po.group_id IN
                      (SELECT group_id FROM group_memberships WHERE profile_id = ?1 AND is_active = 1))
               AND (?2 IS NULL OR c.post_id = ?2)
             ORDER BY c.created_at, c.id
             LIMIT ?3"
        ))
        .bind(member_of)
        .bind(post_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(pool: &SqlitePool, post_id: i64, author_id: i64, content: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO comments (post_id, author_id, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(content)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn set_content(pool: &SqlitePool, id: i64, content: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
