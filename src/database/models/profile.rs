use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

/// Member profile joined with the account fields clients display
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub is_elder: bool,
}

/// Profile plus its church and group memberships
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    #[serde(flatten)]
    pub profile: Profile,
    pub image_url: Option<String>,
    pub churches: Vec<i64>,
    pub groups: Vec<i64>,
}

const PROFILE_SELECT: &str = "SELECT p.id, p.user_id, u.username, u.email, u.first_name, u.last_name,
        p.phone, p.image, p.bio, p.is_admin, p.is_elder
   FROM profiles p
   JOIN users u ON u.id = p.user_id";

impl Profile {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!("{PROFILE_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!("{PROFILE_SELECT} WHERE p.user_id = ?"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!("{PROFILE_SELECT} ORDER BY u.first_name, u.username"))
            .fetch_all(pool)
            .await
    }

    /// The caller's own profile plus every profile sharing a church with it
    pub async fn list_visible_to(pool: &SqlitePool, profile_id: i64) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "{PROFILE_SELECT}
             WHERE p.id = ?1
                OR p.id IN (SELECT pc.profile_id FROM profile_churches pc
                             WHERE pc.church_id IN (SELECT church_id FROM profile_churches WHERE profile_id = ?1))
             ORDER BY u.first_name, u.username"
        ))
        .bind(profile_id)
        .fetch_all(pool)
        .await
    }

    /// Create the profile row for a freshly inserted account
    pub async fn insert_for_user<'e, E>(
        executor: E,
        user_id: i64,
        phone: Option<&str>,
        is_admin: bool,
        is_elder: bool,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "INSERT INTO profiles (user_id, phone, is_admin, is_elder) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(phone)
        .bind(is_admin)
        .bind(is_elder)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Write back the profile-owned columns (account columns live on `User`)
    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE profiles SET phone = ?, image = ?, bio = ?, is_admin = ?, is_elder = ? WHERE id = ?",
        )
        .bind(&self.phone)
        .bind(&self.image)
        .bind(&self.bio)
        .bind(self.is_admin)
        .bind(self.is_elder)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn church_ids(pool: &SqlitePool, profile_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT church_id FROM profile_churches WHERE profile_id = ? ORDER BY church_id")
            .bind(profile_id)
            .fetch_all(pool)
            .await
    }

    pub async fn group_ids(pool: &SqlitePool, profile_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT group_id FROM group_memberships WHERE profile_id = ? AND is_active = 1 ORDER BY group_id",
        )
        .bind(profile_id)
        .fetch_all(pool)
        .await
    }

    pub async fn add_church<'e, E>(executor: E, profile_id: i64, church_id: i64) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("INSERT OR IGNORE INTO profile_churches (profile_id, church_id) VALUES (?, ?)")
            .bind(profile_id)
            .bind(church_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn clear_churches(pool: &SqlitePool, profile_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM profile_churches WHERE profile_id = ?")
            .bind(profile_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Profile ids from `ids` that exist; used to validate recipient lists
    pub async fn existing_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if Self::exists(pool, *id).await? {
                found.push(*id);
            }
        }
        Ok(found)
    }
}
