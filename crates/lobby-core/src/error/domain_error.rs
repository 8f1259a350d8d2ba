//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::UserId;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must be at least 6 characters long")]
    InvalidPassword,

    #[error("First name must be at least 2 characters long")]
    InvalidFirstName,

    #[error("Last name must be at least 2 characters long")]
    InvalidLastName,

    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    // =========================================================================
    // Credential Errors
    // =========================================================================
    #[error("Invalid credentials")]
    InvalidCredentials,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("User with this email already exists")]
    UserExists,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "UNKNOWN_USER",

            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidFirstName => "INVALID_FIRST_NAME",
            Self::InvalidLastName => "INVALID_LAST_NAME",
            Self::InvalidStatus(_) => "INVALID_STATUS",

            Self::InvalidCredentials => "INVALID_CREDENTIALS",

            Self::UserExists => "USER_EXISTS",

            Self::StoreError(_) => "STORE_ERROR",
            Self::NotificationError(_) => "NOTIFICATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail
                | Self::InvalidPassword
                | Self::InvalidFirstName
                | Self::InvalidLastName
                | Self::InvalidStatus(_)
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::UserExists)
    }

    /// Check if this error came from a collaborator rather than from the input
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::StoreError(_) | Self::NotificationError(_) | Self::InternalError(_)
        )
    }
}
