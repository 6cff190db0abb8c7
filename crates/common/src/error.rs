//! Error types for starling.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Federation handlers translate these into the HTTP responses the
/// ActivityPub peers expect; local action handlers surface the domain
/// variants (`AlreadyFollowing`, `SelfFollowNotAllowed`, ...) so callers
/// can show specific messaging.
#[derive(Debug, Error)]
pub enum AppError {
    // === Protocol / federation errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Missing Signature header")]
    SignatureMissing,

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Key parse error: {0}")]
    KeyParse(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Actor resolution failed: {0}")]
    ActorResolveFailed(String),

    #[error("Actor document invalid: {0}")]
    ActorInvalid(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // === Local action errors ===
    #[error("Already following")]
    AlreadyFollowing,

    #[error("Follow request pending")]
    FollowPending,

    #[error("Already subscribed to relay")]
    AlreadySubscribed,

    #[error("Relay subscription pending")]
    SubscriptionPending,

    #[error("Cannot follow yourself")]
    SelfFollowNotAllowed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Server errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Protocol(_) | Self::KeyParse(_) | Self::ActorResolveFailed(_)
            | Self::ActorInvalid(_) => StatusCode::BAD_REQUEST,
            Self::SignatureMissing | Self::SignatureInvalid(_) => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::DuplicateKey(_)
            | Self::AlreadyFollowing
            | Self::FollowPending
            | Self::AlreadySubscribed
            | Self::SubscriptionPending => StatusCode::CONFLICT,
            Self::SelfFollowNotAllowed | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::SignatureMissing => "SIGNATURE_MISSING",
            Self::SignatureInvalid(_) => "SIGNATURE_INVALID",
            Self::KeyParse(_) => "KEY_PARSE_ERROR",
            Self::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::DuplicateKey(_) => "DUPLICATE_KEY",
            Self::ActorResolveFailed(_) => "ACTOR_RESOLVE_FAILED",
            Self::ActorInvalid(_) => "ACTOR_INVALID",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::AlreadyFollowing => "ALREADY_FOLLOWING",
            Self::FollowPending => "FOLLOW_PENDING",
            Self::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            Self::SubscriptionPending => "SUBSCRIPTION_PENDING",
            Self::SelfFollowNotAllowed => "SELF_FOLLOW_NOT_ALLOWED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Whether a storage error is worth retrying inside the transaction
    /// wrapper (lock contention on the shared writer).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(msg) => {
                msg.contains("database is locked")
                    || msg.contains("database table is locked")
                    || msg.contains("busy")
            }
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::Protocol(format!("invalid URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::SignatureMissing.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::DuplicateKey("activity".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::SelfFollowNotAllowed.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_transient_detection() {
        assert!(AppError::Database("database is locked".into()).is_transient());
        assert!(!AppError::Database("no such table: note".into()).is_transient());
        assert!(!AppError::Transport("timeout".into()).is_transient());
    }
}
