// handlers/public/auth.rs - POST /api/register/ and POST /api/login/

use axum::extract::State;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::Payload;
use crate::app::AppState;
use crate::auth;
use crate::database::models::{User, UserSummary};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, NewAccount};

/// Token plus the account it belongs to
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserSummary,
}

/// POST /api/register/ - Open an account and receive a token
///
/// `email` and `password` are required; `username` defaults to the e-mail.
/// `churches` (or the older `Igreja_Participante`) links the new profile to
/// existing churches.
pub async fn register(State(state): State<AppState>, payload: Payload) -> ApiResult<TokenResponse> {
    payload.require(&["email", "password"])?;

    let email = payload.string("email")?.unwrap_or_default().to_lowercase();
    let username = payload.string("username")?.unwrap_or_else(|| email.clone());
    let churches = match payload.id_list("churches")? {
        Some(ids) => ids,
        None => payload.id_list("Igreja_Participante")?.unwrap_or_default(),
    };

    let account = NewAccount {
        username,
        email,
        password: payload.text("password")?.unwrap_or_default(),
        first_name: payload.string("name")?.unwrap_or_default(),
        last_name: payload.string("last_name")?.unwrap_or_default(),
        phone: payload.string("phone")?,
        churches,
        ..NewAccount::default()
    };

    let service = AccountService::new(state.pool.clone(), state.config.security.password_hash_cost);
    let (user, token) = service.create(account, true).await?;
    let token = token.ok_or_else(|| ApiError::internal_server_error("Token was not issued"))?;

    Ok(ApiResponse::created(TokenResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// POST /api/login/ - Exchange credentials for a token
///
/// The identifier may arrive as `username` or `email`. Usernames match
/// case-insensitively first, then the e-mail address is tried.
/// Logging in replaces the caller's previous token.
pub async fn login(State(state): State<AppState>, payload: Payload) -> ApiResult<TokenResponse> {
    let identifier = match payload.string("username")? {
        Some(username) => Some(username),
        None => payload.string("email")?,
    };
    let password = payload.text("password")?.filter(|p| !p.is_empty());

    let (identifier, password) = match (identifier, password) {
        (Some(identifier), Some(password)) => (identifier, password),
        (identifier, password) => {
            let mut missing = Vec::new();
            if identifier.is_none() {
                missing.push("username".to_string());
            }
            if password.is_none() {
                missing.push("password".to_string());
            }
            return Err(ApiError::validation_error("Username and password are required.", missing));
        }
    };

    let Some(user) = find_active_user(&state, &identifier, &password).await? else {
        warn!("Failed login for {}", identifier);
        return Err(ApiError::unauthorized("Invalid credentials."));
    };

    let token = auth::issue_token(&state.pool, user.id).await?;
    auth::ensure_profile(&state.pool, &user).await?;
    User::touch_last_login(&state.pool, user.id).await?;
    info!("User {} logged in", user.username);

    Ok(ApiResponse::success(TokenResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// Username match first, then e-mail; either must carry the password
async fn find_active_user(state: &AppState, identifier: &str, password: &str) -> Result<Option<User>, ApiError> {
    let candidates = [
        User::find_by_username(&state.pool, identifier).await?,
        User::find_by_email(&state.pool, identifier).await?,
    ];

    for user in candidates.into_iter().flatten() {
        if user.is_active && auth::verify_password(password, &user.password_hash).await? {
            return Ok(Some(user));
        }
    }
    Ok(None)
}
