//! Service layer error types
//!
//! [`ServiceError`] is what callers see. Dependency failures keep their cause for
//! the log line but render a fixed message.

use std::time::Duration;

use lobby_core::DomainError;
use serde::Serialize;

/// Error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; the caller must correct it
    Validation,
    /// No session or bad credentials
    Authentication,
    /// Duplicate email
    Conflict,
    /// Retry after the window elapses
    RateLimit,
    /// Unexpected lower-layer failure
    Dependency,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Conflict => "conflict",
            Self::RateLimit => "rate_limit",
            Self::Dependency => "dependency",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Validation and conflict errors pass through with their own code
    #[error(transparent)]
    Domain(DomainError),

    #[error("You must be logged in")]
    NotAuthenticated,

    #[error("Login failed")]
    LoginFailed,

    #[error("Too many requests. Please slow down.")]
    RateLimited { retry_after: Duration },

    #[error("Failed to create user account")]
    RegistrationFailed,

    #[error("Failed to update profile")]
    ProfileUpdateFailed,

    #[error("Failed to update status")]
    StatusUpdateFailed,

    #[error("Failed to change password. Please check your current password.")]
    PasswordChangeFailed,

    /// Cause is for logs only
    #[error("Internal error")]
    Internal(String),
}

impl ServiceError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(e) if e.is_validation() => ErrorKind::Validation,
            Self::Domain(e) if e.is_conflict() => ErrorKind::Conflict,
            Self::Domain(DomainError::InvalidCredentials) => ErrorKind::Authentication,
            Self::Domain(_) => ErrorKind::Dependency,
            Self::NotAuthenticated | Self::LoginFailed => ErrorKind::Authentication,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::RegistrationFailed
            | Self::ProfileUpdateFailed
            | Self::StatusUpdateFailed
            | Self::PasswordChangeFailed
            | Self::Internal(_) => ErrorKind::Dependency,
        }
    }

    /// Get the error code for wire responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::RegistrationFailed => "REGISTRATION_FAILED",
            Self::ProfileUpdateFailed | Self::StatusUpdateFailed => "UPDATE_FAILED",
            Self::PasswordChangeFailed => "PASSWORD_CHANGE_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// How long a rate-limited caller should wait
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
