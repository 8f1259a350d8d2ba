//! Request DTOs for method calls

use lobby_core::{NewAccount, ProfileChanges};
use serde::Deserialize;

// ============================================================================
// Auth Requests
// ============================================================================

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// Either a password login or a resume-token login
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginRequest {
    Resume { resume: String },
    Password { email: String, password: String },
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resume { .. } => f.write_str("LoginRequest::Resume"),
            Self::Password { email, .. } => f
                .debug_struct("LoginRequest::Password")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Account Requests
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Empty string removes the avatar
    pub avatar: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            avatar: req.avatar,
        }
    }
}

/// Accepts `"away"` as well as `{"status": "away"}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UpdateStatusRequest {
    Bare(String),
    Object { status: String },
}

impl UpdateStatusRequest {
    pub fn status(&self) -> &str {
        match self {
            Self::Bare(status) | Self::Object { status } => status,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl std::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangePasswordRequest { .. }")
    }
}

// ============================================================================
// View Parameters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AllUsersParams {
    pub limit: Option<i64>,
}
