//! Account store trait (port) - durable user records
//!
//! The store exclusively owns account records and credential hashes. The presence
//! side of the system only ever touches `profile.status` and `profile.last_seen`
//! through [`AccountStore::set_presence`] and [`AccountStore::expire_inactive`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{NewAccount, ProfileChanges, User};
use crate::error::DomainError;
use crate::value_objects::{UserId, UserStatus};

/// Result type for store operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Record filter for read views
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Only this record
    pub only: Option<UserId>,
    /// Every record except this one
    pub exclude: Option<UserId>,
    /// Only records whose status is in this set
    pub statuses: Option<Vec<UserStatus>>,
}

impl UserFilter {
    /// Match every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Match a single record
    pub fn only(id: UserId) -> Self {
        Self {
            only: Some(id),
            ..Self::default()
        }
    }

    /// Match online or away records
    pub fn present() -> Self {
        Self {
            statuses: Some(UserStatus::PRESENT.to_vec()),
            ..Self::default()
        }
    }

    /// Exclude one record
    pub fn excluding(mut self, id: UserId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Evaluate the filter against a record
    pub fn matches(&self, user: &User) -> bool {
        if self.only.is_some_and(|id| id != user.id) {
            return false;
        }
        if self.exclude.is_some_and(|id| id == user.id) {
            return false;
        }
        match &self.statuses {
            Some(statuses) => statuses.contains(&user.profile.status),
            None => true,
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Create an account, hashing the credential. Returns the new user's ID.
    ///
    /// Fails with [`DomainError::UserExists`] if the email is already taken.
    async fn create(&self, account: NewAccount, now: DateTime<Utc>) -> RepoResult<UserId>;

    /// Check an email/password pair. `Ok(None)` means the credentials do not match.
    async fn verify_credentials(&self, email: &str, password: &str) -> RepoResult<Option<User>>;

    /// Apply a partial profile update
    async fn update_profile(&self, id: UserId, changes: &ProfileChanges) -> RepoResult<()>;

    /// Set status and last-seen together on one record
    async fn set_presence(&self, id: UserId, status: UserStatus, at: DateTime<Utc>)
        -> RepoResult<()>;

    /// Set every online/away user last seen before `cutoff` offline in one batch.
    /// Returns the IDs that changed.
    async fn expire_inactive(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UserId>>;

    /// Verify the old password and replace it with the new one
    ///
    /// Fails with [`DomainError::InvalidCredentials`] if `old_password` does not match.
    async fn change_password(
        &self,
        id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> RepoResult<()>;

    /// Queue a verification email for the account's primary address
    async fn send_verification_email(&self, id: UserId) -> RepoResult<()>;

    /// Records matching `filter`, most recently seen first, at most `limit` of them
    async fn find_users(&self, filter: &UserFilter, limit: usize) -> RepoResult<Vec<User>>;
}
