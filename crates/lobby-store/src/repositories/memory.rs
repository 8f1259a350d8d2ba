//! In-memory account store
//!
//! Records live in a `DashMap` keyed by user ID with a second map indexing the
//! normalized email. Nothing survives a restart.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::instrument;

use lobby_common::PasswordService;
use lobby_core::entities::{NewAccount, ProfileChanges, User};
use lobby_core::error::DomainError;
use lobby_core::traits::{AccountStore, RepoResult, UserFilter};
use lobby_core::validation::normalize_email;
use lobby_core::value_objects::{UserId, UserStatus};

use super::error::user_not_found;

struct AccountRecord {
    user: User,
    password_hash: String,
}

/// A verification email handed to the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentVerification {
    pub user_id: UserId,
    pub address: String,
    pub token: String,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<UserId, AccountRecord>,
    by_email: DashMap<String, UserId>,
    outbox: Mutex<Vec<SentVerification>>,
    passwords: PasswordService,
    unavailable: AtomicBool,
    mail_unavailable: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store call fail with `StoreError` until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make verification emails fail with `NotificationError` until switched back
    pub fn set_mail_unavailable(&self, unavailable: bool) {
        self.mail_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Verification emails sent so far, oldest first
    pub fn sent_verifications(&self) -> Vec<SentVerification> {
        self.outbox.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn check_available(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::StoreError("store unavailable".to_string()));
        }
        Ok(())
    }

    fn with_record<T>(
        &self,
        id: UserId,
        f: impl FnOnce(&mut AccountRecord) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut record = self.accounts.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        f(&mut record)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.check_available()?;
        Ok(self.accounts.get(&id).map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.check_available()?;
        let Some(id) = self.by_email.get(&normalize_email(email)).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|r| r.user.clone()))
    }

    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create(&self, account: NewAccount, now: DateTime<Utc>) -> RepoResult<UserId> {
        self.check_available()?;
        let password_hash = self.passwords.hash(&account.password)?;
        let user = User::register(UserId::generate(), &account, now);
        let id = user.id;

        // The email index entry is the uniqueness lock
        match self.by_email.entry(normalize_email(&account.email)) {
            Entry::Occupied(_) => return Err(DomainError::UserExists),
            Entry::Vacant(slot) => {
                self.accounts.insert(id, AccountRecord { user, password_hash });
                slot.insert(id);
            }
        }

        Ok(id)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> RepoResult<Option<User>> {
        self.check_available()?;
        let Some(id) = self.by_email.get(&normalize_email(email)).map(|id| *id) else {
            return Ok(None);
        };
        let Some((user, hash)) = self
            .accounts
            .get(&id)
            .map(|r| (r.user.clone(), r.password_hash.clone()))
        else {
            return Ok(None);
        };

        Ok(self.passwords.verify(password, &hash)?.then_some(user))
    }

    async fn update_profile(&self, id: UserId, changes: &ProfileChanges) -> RepoResult<()> {
        self.check_available()?;
        self.with_record(id, |record| {
            record.user.profile.apply(changes);
            Ok(())
        })
    }

    async fn set_presence(
        &self,
        id: UserId,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.check_available()?;
        self.with_record(id, |record| {
            record.user.profile.record_presence(status, at);
            Ok(())
        })
    }

    async fn expire_inactive(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UserId>> {
        self.check_available()?;
        let mut expired = Vec::new();
        for mut record in self.accounts.iter_mut() {
            if record.user.profile.is_stale(cutoff) {
                record.user.profile.status = UserStatus::Offline;
                expired.push(record.user.id);
            }
        }
        Ok(expired)
    }

    async fn change_password(
        &self,
        id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> RepoResult<()> {
        self.check_available()?;
        let current = self
            .accounts
            .get(&id)
            .map(|r| r.password_hash.clone())
            .ok_or_else(|| user_not_found(id))?;

        if !self.passwords.verify(old_password, &current)? {
            return Err(DomainError::InvalidCredentials);
        }
        let replacement = self.passwords.hash(new_password)?;

        self.with_record(id, |record| {
            record.password_hash = replacement;
            Ok(())
        })
    }

    #[instrument(skip(self))]
    async fn send_verification_email(&self, id: UserId) -> RepoResult<()> {
        self.check_available()?;
        if self.mail_unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::NotificationError(
                "mail transport unavailable".to_string(),
            ));
        }

        let address = self
            .accounts
            .get(&id)
            .ok_or_else(|| user_not_found(id))?
            .user
            .primary_email()
            .map(str::to_string)
            .ok_or_else(|| DomainError::NotificationError(format!("{id} has no email")))?;

        tracing::info!(user_id = %id, "Verification email queued");
        self.outbox.lock().push(SentVerification {
            user_id: id,
            address,
            token: uuid::Uuid::new_v4().simple().to_string(),
        });
        Ok(())
    }

    async fn find_users(&self, filter: &UserFilter, limit: usize) -> RepoResult<Vec<User>> {
        self.check_available()?;
        let mut users: Vec<User> = self
            .accounts
            .iter()
            .filter(|r| filter.matches(&r.user))
            .map(|r| r.user.clone())
            .collect();

        users.sort_by(|a, b| b.profile.last_seen.cmp(&a.profile.last_seen));
        users.truncate(limit);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "hunter22".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryAccountStore::new();
        let now = Utc::now();
        let id = store.create(account("Ada@Example.com"), now).await.unwrap();

        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.profile.status, UserStatus::Online);
        assert_eq!(user.profile.last_seen, now);

        let by_email = store.find_by_email("ADA@example.COM").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_email_case_insensitive() {
        let store = MemoryAccountStore::new();
        store.create(account("ada@example.com"), Utc::now()).await.unwrap();

        let err = store
            .create(account("ADA@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserExists));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let store = MemoryAccountStore::new();
        let id = store.create(account("ada@example.com"), Utc::now()).await.unwrap();

        let user = store
            .verify_credentials("ada@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.map(|u| u.id), Some(id));

        assert!(store
            .verify_credentials("ada@example.com", "wrong-pass")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .verify_credentials("nobody@example.com", "hunter22")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = MemoryAccountStore::new();
        let id = store.create(account("ada@example.com"), Utc::now()).await.unwrap();

        let err = store.change_password(id, "wrong-pass", "newpass1").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));

        store.change_password(id, "hunter22", "newpass1").await.unwrap();
        assert!(store
            .verify_credentials("ada@example.com", "newpass1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_expire_inactive_leaves_last_seen() {
        let store = MemoryAccountStore::new();
        let start = Utc::now();
        let stale = store.create(account("a@example.com"), start).await.unwrap();
        let fresh = store.create(account("b@example.com"), start).await.unwrap();
        store
            .set_presence(fresh, UserStatus::Away, start + Duration::minutes(5))
            .await
            .unwrap();

        let expired = store
            .expire_inactive(start + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(expired, vec![stale]);

        let user = store.find_by_id(stale).await.unwrap().unwrap();
        assert_eq!(user.profile.status, UserStatus::Offline);
        assert_eq!(user.profile.last_seen, start);

        // Already offline users are not reported twice
        assert!(store
            .expire_inactive(start + Duration::minutes(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_users_sorted_and_limited() {
        let store = MemoryAccountStore::new();
        let start = Utc::now();
        let a = store.create(account("a@example.com"), start).await.unwrap();
        let b = store
            .create(account("b@example.com"), start + Duration::seconds(10))
            .await
            .unwrap();
        let c = store
            .create(account("c@example.com"), start + Duration::seconds(20))
            .await
            .unwrap();
        store
            .set_presence(b, UserStatus::Offline, start + Duration::seconds(30))
            .await
            .unwrap();

        let all = store.find_users(&UserFilter::all(), 10).await.unwrap();
        let ids: Vec<_> = all.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b, c, a]);

        let present = store
            .find_users(&UserFilter::present().excluding(c), 10)
            .await
            .unwrap();
        assert_eq!(present.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a]);

        assert_eq!(store.find_users(&UserFilter::all(), 2).await.unwrap().len(), 2);
        assert!(store.find_users(&UserFilter::all(), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let store = MemoryAccountStore::new();
        let id = UserId::generate();

        let err = store
            .set_presence(id, UserStatus::Online, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_outage_switches() {
        let store = MemoryAccountStore::new();
        let id = store.create(account("a@example.com"), Utc::now()).await.unwrap();

        store.set_mail_unavailable(true);
        assert!(matches!(
            store.send_verification_email(id).await,
            Err(DomainError::NotificationError(_))
        ));
        store.set_mail_unavailable(false);
        store.send_verification_email(id).await.unwrap();
        assert_eq!(store.sent_verifications()[0].address, "a@example.com");

        store.set_unavailable(true);
        assert!(matches!(
            store.find_by_id(id).await,
            Err(DomainError::StoreError(_))
        ));
    }
}
