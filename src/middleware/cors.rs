use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::config::SecurityConfig;

const API_PREFIX: &str = "/api/";
const ALLOW_METHODS: HeaderValue = HeaderValue::from_static("GET, POST, OPTIONS");
const ALLOW_HEADERS: HeaderValue = HeaderValue::from_static("Content-Type, Authorization");

/// Which origins get an `Access-Control-Allow-Origin` back
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_all: bool,
    origins: Arc<Vec<HeaderValue>>,
}

impl CorsPolicy {
    pub fn new(security: &SecurityConfig) -> Self {
        let origins = security
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring malformed CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        Self {
            allow_all: security.cors_allow_all,
            origins: Arc::new(origins),
        }
    }

    /// Allow-all echoes the caller's origin, or `*` when it sent none
    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match origin {
            Some(origin) if self.allow_all || self.origins.contains(origin) => Some(origin.clone()),
            None if self.allow_all => Some(HeaderValue::from_static("*")),
            _ => None,
        }
    }

    fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(allowed) = self.allow_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            if origin.is_some() {
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS);
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS);
    }
}

/// CORS for everything under `/api/`. Any `OPTIONS` there is answered with an
/// empty 200, preflight or not; other paths pass through untouched.
pub async fn cors_middleware(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    if !request.uri().path().starts_with(API_PREFIX) {
        return next.run(request).await;
    }

    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };
    policy.apply(origin.as_ref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow_all: bool) -> CorsPolicy {
        CorsPolicy::new(&SecurityConfig {
            cors_allow_all: allow_all,
            cors_origins: vec!["https://app.iasd.local".to_string(), "not a header\n".to_string()],
            token_ttl_hours: 0,
            password_hash_cost: 4,
        })
    }

    #[test]
    fn allow_all_falls_back_to_wildcard() {
        let mut headers = HeaderMap::new();
        policy(true).apply(None, &mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::VARY).is_none());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    }

    #[test]
    fn allow_list_only_echoes_known_origins() {
        let policy = policy(false);
        assert_eq!(policy.origins.len(), 1);

        let known = HeaderValue::from_static("https://app.iasd.local");
        let mut headers = HeaderMap::new();
        policy.apply(Some(&known), &mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.iasd.local");
        assert_eq!(headers[header::VARY], "Origin");

        let mut headers = HeaderMap::new();
        policy.apply(Some(&HeaderValue::from_static("https://evil.example")), &mut headers);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");

        let mut headers = HeaderMap::new();
        policy.apply(None, &mut headers);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
