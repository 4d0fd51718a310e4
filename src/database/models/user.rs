use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

/// Login account. Never serialized directly: it carries the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Public shape of an account, returned by login, register and `auth/me`
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.first_name.clone(),
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_staff, is_superuser, is_active, date_joined, last_login";

impl User {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive username lookup
    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Case-insensitive e-mail lookup. E-mail is not unique, so the oldest account wins.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// True when either the username or the e-mail is already taken (case-insensitive)
    pub async fn exists<'e, E>(executor: E, username: &str, email: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE username = ?1 COLLATE NOCASE
                OR username = ?2 COLLATE NOCASE
                OR (?2 <> '' AND email = ?2 COLLATE NOCASE)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    /// Insert the account and return its id. `id` and `last_login` are ignored.
    pub async fn insert<'e, E>(&self, executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash,
                                is_staff, is_superuser, is_active, date_joined)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.password_hash)
        .bind(self.is_staff)
        .bind(self.is_superuser)
        .bind(self.is_active)
        .bind(self.date_joined)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Write back every mutable column
    pub async fn save<'e, E>(&self, executor: E) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?,
                    password_hash = ?, is_staff = ?, is_superuser = ?, is_active = ?
             WHERE id = ?",
        )
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.password_hash)
        .bind(self.is_staff)
        .bind(self.is_superuser)
        .bind(self.is_active)
        .bind(self.id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn touch_last_login(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Deleting the account cascades to its profile, token and everything they own
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
