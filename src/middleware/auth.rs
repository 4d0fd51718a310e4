use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::app::AppState;
use crate::auth::{self, AuthError};
use crate::database::models::{Profile, User};
use crate::error::ApiError;

/// Authenticated caller resolved from the `Authorization` header
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub profile: Profile,
    /// The key the caller presented; logout revokes it
    pub token: String,
}

/// Token authentication middleware for every protected route.
/// Resolves the caller into request extensions or answers 401.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_token_from_headers(request.headers())?;

    let auth_user = auth::authenticate(&state.pool, &key, state.config.token_ttl())
        .await
        .map_err(|err| {
            if !matches!(err, AuthError::Database(_)) {
                warn!("Authentication failed for {}: {}", request.uri().path(), err);
            }
            ApiError::from(err)
        })?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Extract the token key from the Authorization header
fn extract_token_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Auth token required."))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid token."))?;

    auth::parse_authorization(value)
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Invalid token."))
}

/// Handlers take `AuthUser` directly; the middleware must have run first
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Auth token required."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_asks_for_a_token() {
        let err = extract_token_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.message(), "Auth token required.");
    }

    #[test]
    fn unknown_scheme_is_an_invalid_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        let err = extract_token_from_headers(&headers).unwrap_err();
        assert_eq!(err.message(), "Invalid token.");
    }

    #[test]
    fn token_scheme_yields_the_key() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token 0123abcd"));
        assert_eq!(extract_token_from_headers(&headers).unwrap(), "0123abcd");
    }
}
