use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API-level failure. Every variant maps to a stable machine-readable code
/// and an HTTP status; bodies are always `{"success": false, "error", "message"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("Email already registered")]
    EmailExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("You don't own this resource")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Already saved")]
    Duplicate(serde_json::Value),
    #[error("{0} service is not configured")]
    ApiKeyMissing(&'static str),
    #[error("Upstream service took too long to respond")]
    UpstreamTimeout,
    #[error("Upstream service is unavailable")]
    UpstreamUnavailable,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFields(_) => "missing_fields",
            ApiError::EmailExists => "email_exists",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::InvalidToken => "invalid_token",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::ApiKeyMissing(_) => "api_key_missing",
            ApiError::UpstreamTimeout => "upstream_timeout",
            ApiError::UpstreamUnavailable => "upstream_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailExists | ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ApiKeyMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!(error = %e, "internal error");
        }
        let mut body = json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        // A duplicate save hands the caller the record that already exists.
        if let ApiError::Duplicate(existing) = &self {
            body["item"] = existing.clone();
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::MissingFields("x").code(), "missing_fields");
        assert_eq!(ApiError::EmailExists.code(), "email_exists");
        assert_eq!(ApiError::InvalidCredentials.code(), "invalid_credentials");
        assert_eq!(ApiError::InvalidToken.code(), "invalid_token");
        assert_eq!(ApiError::Unauthorized.code(), "unauthorized");
        assert_eq!(ApiError::NotFound("item").code(), "not_found");
        assert_eq!(
            ApiError::Duplicate(serde_json::Value::Null).code(),
            "duplicate"
        );
        assert_eq!(ApiError::ApiKeyMissing("NASA").code(), "api_key_missing");
    }

    #[test]
    fn ownership_violation_is_403_not_401() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn credential_errors_share_one_message() {
        // Unknown email and bad password must be indistinguishable.
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
