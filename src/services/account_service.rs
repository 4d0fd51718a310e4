use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{self, AuthError};
use crate::database::models::{Profile, User};
use crate::error::ApiError;

/// Everything needed to open an account
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub churches: Vec<i64>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_admin: bool,
    pub is_elder: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Account already exists: {0}")]
    AlreadyExists(String),
    #[error("Unknown church: {0}")]
    UnknownChurch(i64),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => e.into(),
            AccountError::Auth(e) => e.into(),
            AccountError::AlreadyExists(_) => {
                ApiError::bad_request("A user with that username or email already exists.")
            }
            AccountError::UnknownChurch(id) => {
                ApiError::invalid_field("churches", format!("Church {id} does not exist."))
            }
        }
    }
}

/// Account creation: user, profile, church links and optionally a token
pub struct AccountService {
    pool: SqlitePool,
    hash_cost: u32,
}

impl AccountService {
    pub fn new(pool: SqlitePool, hash_cost: u32) -> Self {
        Self { pool, hash_cost }
    }

    /// Create the account in one transaction. Returns the stored user and,
    /// when `issue_token` is set, a fresh API key.
    pub async fn create(&self, account: NewAccount, issue_token: bool) -> Result<(User, Option<String>), AccountError> {
        let password_hash = auth::hash_password(&account.password, self.hash_cost).await?;

        let mut tx = self.pool.begin().await?;

        if User::exists(&mut *tx, &account.username, &account.email).await? {
            return Err(AccountError::AlreadyExists(account.username));
        }

        let mut user = User {
            id: 0,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            password_hash,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        user.id = user.insert(&mut *tx).await?;

        let profile_id = Profile::insert_for_user(
            &mut *tx,
            user.id,
            account.phone.as_deref(),
            account.is_admin,
            account.is_elder,
        )
        .await?;

        for church_id in &account.churches {
            let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM churches WHERE id = ?")
                .bind(church_id)
                .fetch_one(&mut *tx)
                .await?;
            if known == 0 {
                return Err(AccountError::UnknownChurch(*church_id));
            }
            Profile::add_church(&mut *tx, profile_id, *church_id).await?;
        }

        let token = if issue_token {
            Some(auth::issue_token(&mut *tx, user.id).await?)
        } else {
            None
        };

        tx.commit().await?;
        info!("Created account {} (user {})", user.username, user.id);
        Ok((user, token))
    }

    /// Grant administrator rights to an existing account, resetting its password
    pub async fn promote_to_admin(&self, mut user: User, password: &str) -> Result<User, AccountError> {
        user.password_hash = auth::hash_password(password, self.hash_cost).await?;
        user.is_staff = true;
        user.is_superuser = true;
        user.is_active = true;
        user.save(&self.pool).await?;

        let profile = auth::ensure_profile(&self.pool, &user).await?;
        sqlx::query("UPDATE profiles SET is_admin = 1 WHERE id = ?")
            .bind(profile.id)
            .execute(&self.pool)
            .await?;
        info!("Promoted {} to administrator", user.username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;

    fn account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: username.to_string(),
            password: "StrongPass123!".to_string(),
            first_name: "Joana".to_string(),
            ..NewAccount::default()
        }
    }

    #[tokio::test]
    async fn creates_user_profile_and_token_together() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let service = AccountService::new(pool.clone(), 4);

        let (user, token) = service.create(account("joana@iasd.local"), true).await.unwrap();
        assert!(user.id > 0);
        let key = token.unwrap();
        let resolved = auth::authenticate(&pool, &key, None).await.unwrap();
        assert_eq!(resolved.user.id, user.id);
        assert_eq!(resolved.profile.first_name, "Joana");
    }

    #[tokio::test]
    async fn duplicates_are_case_insensitive_and_leave_nothing_behind() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let service = AccountService::new(pool.clone(), 4);
        service.create(account("joana@iasd.local"), false).await.unwrap();

        let err = service.create(account("JOANA@iasd.local"), true).await.unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists(_)));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool).await.unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn unknown_church_rolls_back_the_account() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let service = AccountService::new(pool.clone(), 4);
        let mut new = account("pedro@iasd.local");
        new.churches = vec![99];

        let err = service.create(new, true).await.unwrap_err();
        assert!(matches!(err, AccountError::UnknownChurch(99)));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool).await.unwrap();
        assert_eq!(users, 0);
    }
}
