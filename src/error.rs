use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::media::MediaError;

/// Error returned by every handler. The message is always safe to show to
/// clients; internal causes are logged where the conversion happens.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// 400 naming the offending fields
    #[error("{message}")]
    ValidationError { message: String, fields: Vec<String> },

    /// Body could not be read as an object at all
    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InternalServerError(String),

    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::ValidationError { .. } | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationError { message, .. } => message,
            Self::BadRequest(msg)
            | Self::InvalidPayload(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::InternalServerError(msg)
            | Self::ServiceUnavailable(msg) => msg,
        }
    }

    /// Stable machine-readable code for clients
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// `{"error": true, "detail", "code"}` plus `fields` for validation errors
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "detail": self.message(),
            "code": self.error_code(),
        });
        if let Self::ValidationError { fields, .. } = self {
            if !fields.is_empty() {
                body["fields"] = json!(fields);
            }
        }
        body
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            fields,
        }
    }

    /// Validation error tagged with the single offending field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::validation_error(message, vec![field.to_string()])
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Not found."),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::debug!("Unique constraint rejected write: {}", db_err);
                Self::bad_request("A record with these values already exists.")
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                tracing::debug!("Foreign key constraint rejected write: {}", db_err);
                Self::bad_request("Referenced record does not exist.")
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                tracing::debug!("Check constraint rejected write: {}", db_err);
                Self::bad_request("Value out of range.")
            }
            pool_err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
                tracing::error!("Database pool unavailable: {}", pool_err);
                Self::service_unavailable("Database temporarily unavailable.")
            }
            other => {
                tracing::error!("Query failed: {}", other);
                Self::internal_server_error("Database error occurred.")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
            other => {
                tracing::error!("Database error: {}", other);
                Self::service_unavailable("Database temporarily unavailable.")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::unauthorized("Invalid token."),
            AuthError::TokenExpired => Self::unauthorized("Token expired."),
            AuthError::InactiveAccount => Self::unauthorized("User inactive or deleted."),
            AuthError::Database(sqlx_err) => sqlx_err.into(),
            AuthError::Hashing(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                Self::internal_server_error("An error occurred while processing your request.")
            }
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        tracing::error!("Media storage error: {}", err);
        Self::internal_server_error("Failed to store uploaded file.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_fields() {
        let err = ApiError::validation_error("Missing required fields.", vec!["title".into(), "starts_at".into()]);
        let body = err.to_json();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"], json!(["title", "starts_at"]));
    }

    #[test]
    fn plain_errors_have_no_field_list() {
        let body = ApiError::forbidden("Not allowed.").to_json();
        assert_eq!(body["detail"], "Not allowed.");
        assert!(body.get("fields").is_none());
    }

    #[test]
    fn display_is_the_client_message() {
        assert_eq!(ApiError::not_found("Event not found.").to_string(), "Event not found.");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
