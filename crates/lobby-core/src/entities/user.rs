//! User entity - an account with its profile and presence fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::normalize_email;
use crate::value_objects::{UserId, UserStatus};

/// Email record attached to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    pub verified: bool,
}

impl EmailAddress {
    /// Create an unverified address, normalised to lowercase
    pub fn unverified(address: &str) -> Self {
        Self {
            address: normalize_email(address),
            verified: false,
        }
    }
}

/// Display profile and presence fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

impl Profile {
    /// Profile for a freshly registered account: online as of `now`
    pub fn new(first_name: String, last_name: String, now: DateTime<Utc>) -> Self {
        Self {
            first_name,
            last_name,
            avatar: None,
            status: UserStatus::Online,
            last_seen: now,
        }
    }

    /// Record a presence transition.
    ///
    /// Status and last-seen always move together, and last-seen never goes backwards.
    pub fn record_presence(&mut self, status: UserStatus, at: DateTime<Utc>) {
        self.status = status;
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    /// Whether the inactivity sweep should take this profile offline
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_present() && self.last_seen < cutoff
    }

    /// Apply a partial profile update; only supplied fields change
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(avatar) = &changes.avatar {
            let avatar = avatar.trim();
            self.avatar = (!avatar.is_empty()).then(|| avatar.to_string());
        }
    }
}

/// Partial profile update. `None` leaves a field untouched; an empty avatar clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileChanges {
    /// Check if nothing would change
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.avatar.is_none()
    }
}

/// Input for creating an account in the store
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// User account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub emails: Vec<EmailAddress>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build the record for a new registration
    pub fn register(id: UserId, account: &NewAccount, now: DateTime<Utc>) -> Self {
        Self {
            id,
            emails: vec![EmailAddress::unverified(&account.email)],
            profile: Profile::new(
                account.first_name.trim().to_string(),
                account.last_name.trim().to_string(),
                now,
            ),
            created_at: now,
        }
    }

    /// First email address on the account
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(|e| e.address.as_str())
    }

    /// Check whether the account owns `email` (case-insensitive)
    pub fn has_email(&self, email: &str) -> bool {
        let needle = normalize_email(email);
        self.emails.iter().any(|e| e.address == needle)
    }

    /// "First Last"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.profile.first_name, self.profile.last_name)
    }
}
