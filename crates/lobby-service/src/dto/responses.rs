//! Response DTOs for method results and view records
//!
//! User IDs are serialized as hyphenated strings.

use chrono::{DateTime, Utc};
use lobby_core::UserStatus;
use serde::Serialize;

// ============================================================================
// Method Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    /// Resume token for later logins without a password
    pub token: String,
    pub token_expires: DateTime<Utc>,
}

// ============================================================================
// View Records
// ============================================================================

/// Display fields shared by every view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailView {
    pub address: String,
    pub verified: bool,
}

/// The caller's own record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfileView {
    pub id: String,
    pub emails: Vec<EmailView>,
    pub profile: ProfileView,
    pub created_at: DateTime<Utc>,
}

/// Another user as listed in the online and all-users views: no email, no credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub profile: ProfileView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ViewRecord {
    Own(OwnProfileView),
    User(UserSummary),
}
