pub mod access;

use chrono::{DateTime, Utc};
use rand::RngCore;
use sqlx::{SqliteExecutor, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};

use crate::database::models::{AuthToken, Profile, User};
use crate::middleware::AuthUser;

/// Random bytes behind every token key
const KEY_BYTES: usize = 20;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("account inactive or deleted")]
    InactiveAccount,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Extract the key from `Token <key>` or `Bearer <key>`
pub fn parse_authorization(header: &str) -> Option<&str> {
    let header = header.trim();
    let (scheme, key) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// 40 hex characters from the thread-local CSPRNG
pub fn generate_key() -> String {
    let mut buf = [0u8; KEY_BYTES];
    rand::rng().fill_bytes(&mut buf);
    buf.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Issue a fresh key for the account, replacing any previous one
pub async fn issue_token<'e, E>(executor: E, user_id: i64) -> Result<String, AuthError>
where
    E: SqliteExecutor<'e>,
{
    let key = generate_key();
    AuthToken::upsert(executor, user_id, &key).await?;
    debug!("Issued token for user {}", user_id);
    Ok(key)
}

/// Resolve a presented key into the account and profile it belongs to
pub async fn authenticate(
    pool: &SqlitePool,
    key: &str,
    ttl: Option<chrono::Duration>,
) -> Result<AuthUser, AuthError> {
    let token = AuthToken::find_by_key(pool, key)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if token.is_expired(ttl, Utc::now()) {
        AuthToken::delete_by_key(pool, key).await?;
        warn!("Rejected expired token for user {}", token.user_id);
        return Err(AuthError::TokenExpired);
    }

    let user = User::find(pool, token.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or(AuthError::InactiveAccount)?;

    AuthToken::touch(pool, token.id).await?;
    let profile = ensure_profile(pool, &user).await?;

    Ok(AuthUser {
        user,
        profile,
        token: key.to_string(),
    })
}

/// Every account gets a profile; older or CLI-made accounts may lack one
pub async fn ensure_profile(pool: &SqlitePool, user: &User) -> Result<Profile, sqlx::Error> {
    if let Some(profile) = Profile::find_by_user(pool, user.id).await? {
        return Ok(profile);
    }
    Profile::insert_for_user(pool, user.id, None, false, false).await?;
    Profile::find_by_user(pool, user.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Logout: the key stops working immediately
pub async fn revoke(pool: &SqlitePool, key: &str) -> Result<bool, AuthError> {
    Ok(AuthToken::delete_by_key(pool, key).await?)
}

/// Delete every token older than the TTL. A disabled TTL purges nothing.
pub async fn purge_expired(pool: &SqlitePool, ttl: Option<chrono::Duration>) -> Result<u64, AuthError> {
    let Some(ttl) = ttl else {
        return Ok(0);
    };
    let cutoff: DateTime<Utc> = Utc::now() - ttl;
    Ok(AuthToken::delete_issued_before(pool, cutoff).await?)
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password and for a malformed stored hash
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;

    async fn seeded_user(pool: &SqlitePool) -> i64 {
        let user = User {
            id: 0,
            username: "maria".into(),
            email: "maria@example.com".into(),
            first_name: "Maria".into(),
            last_name: String::new(),
            password_hash: "x".into(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        user.insert(pool).await.unwrap()
    }

    #[test]
    fn parses_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer  abc123 "), Some("abc123"));
        assert_eq!(parse_authorization("bearer abc"), Some("abc"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc123"), None);
    }

    #[test]
    fn keys_are_forty_hex_chars_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn issuing_replaces_the_previous_token() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let user_id = seeded_user(&pool).await;

        let first = issue_token(&pool, user_id).await.unwrap();
        let second = issue_token(&pool, user_id).await.unwrap();

        assert!(matches!(authenticate(&pool, &first, None).await, Err(AuthError::InvalidToken)));
        let auth = authenticate(&pool, &second, None).await.unwrap();
        assert_eq!(auth.user.id, user_id);
        assert_eq!(auth.profile.user_id, user_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn expired_token_is_deleted() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let user_id = seeded_user(&pool).await;
        let key = issue_token(&pool, user_id).await.unwrap();

        sqlx::query("UPDATE auth_tokens SET created_at = ?")
            .bind(Utc::now() - chrono::Duration::hours(5))
            .execute(&pool)
            .await
            .unwrap();

        // No TTL: still valid
        assert!(authenticate(&pool, &key, None).await.is_ok());

        let ttl = Some(chrono::Duration::hours(1));
        assert!(matches!(authenticate(&pool, &key, ttl).await, Err(AuthError::TokenExpired)));
        assert!(AuthToken::find_by_key(&pool, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_tokens() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let stale = seeded_user(&pool).await;
        issue_token(&pool, stale).await.unwrap();
        sqlx::query("UPDATE auth_tokens SET created_at = ? WHERE user_id = ?")
            .bind(Utc::now() - chrono::Duration::days(10))
            .bind(stale)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(purge_expired(&pool, None).await.unwrap(), 0);
        assert_eq!(purge_expired(&pool, Some(chrono::Duration::days(1))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn revoked_token_no_longer_authenticates() {
        let pool = DatabaseManager::connect_in_memory().await.unwrap();
        let user_id = seeded_user(&pool).await;
        let key = issue_token(&pool, user_id).await.unwrap();

        assert!(revoke(&pool, &key).await.unwrap());
        assert!(matches!(authenticate(&pool, &key, None).await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn passwords_round_trip_through_bcrypt() {
        let hash = hash_password("Secret123!", 4).await.unwrap();
        assert!(verify_password("Secret123!", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
        assert!(!verify_password("Secret123!", "not-a-hash").await.unwrap());
    }
}
