use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

/// Opaque API token; at most one per account
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub id: i64,
    pub user_id: i64,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<AuthToken>, sqlx::Error> {
        sqlx::query_as::<_, AuthToken>(
            "SELECT id, user_id, key, created_at, last_used_at FROM auth_tokens WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Replace whatever token the account held with `key`
    pub async fn upsert<'e, E>(executor: E, user_id: i64, key: &str) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO auth_tokens (user_id, key, created_at, last_used_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id)
             DO UPDATE SET key = excluded.key,
                           created_at = excluded.created_at,
                           last_used_at = excluded.last_used_at",
        )
        .bind(user_id)
        .bind(key)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn touch(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_key(pool: &SqlitePool, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE key = ?")
            .bind(key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every token issued before `cutoff`
    pub async fn delete_issued_before(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE created_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub fn is_expired(&self, ttl: Option<chrono::Duration>, now: DateTime<Utc>) -> bool {
        match ttl {
            Some(ttl) => self.created_at + ttl < now,
            None => false,
        }
    }
}
