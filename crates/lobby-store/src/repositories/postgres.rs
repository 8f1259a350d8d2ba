//! PostgreSQL implementation of AccountStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use lobby_common::PasswordService;
use lobby_core::entities::{NewAccount, ProfileChanges, User};
use lobby_core::error::DomainError;
use lobby_core::traits::{AccountStore, RepoResult, UserFilter};
use lobby_core::validation::normalize_email;
use lobby_core::value_objects::{UserId, UserStatus};

use crate::models::AccountRow;

use super::error::{map_db_error, map_unique_violation, user_not_found};

const ACCOUNT_COLUMNS: &str =
    "id, email, email_verified, first_name, last_name, avatar, status, last_seen, created_at";

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
    passwords: PasswordService,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            passwords: PasswordService::new(),
        }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE {clause}");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn password_hash(&self, id: UserId) -> RepoResult<String> {
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| user_not_found(id))
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.fetch_one_where("id = $1", &id.to_string()).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.fetch_one_where("email = $1", &normalize_email(email))
            .await
    }

    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create(&self, account: NewAccount, now: DateTime<Utc>) -> RepoResult<UserId> {
        let password_hash = self.passwords.hash(&account.password)?;
        let user = User::register(UserId::generate(), &account, now);
        let email = user.primary_email().unwrap_or_default().to_string();

        sqlx::query(
            r"
            INSERT INTO users (id, email, email_verified, password_hash, first_name, last_name,
                                  avatar, status, last_seen, created_at)
            VALUES ($1, $2, FALSE, $3, $4, $5, NULL, $6, $7, $8)
            ",
        )
        .bind(user.id.to_string())
        .bind(&email)
        .bind(&password_hash)
        .bind(&user.profile.first_name)
        .bind(&user.profile.last_name)
        .bind(user.profile.status.as_str())
        .bind(user.profile.last_seen)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::UserExists))?;

        Ok(user.id)
    }

    #[instrument(skip(self, password))]
    async fn verify_credentials(&self, email: &str, password: &str) -> RepoResult<Option<User>> {
        let email = normalize_email(email);
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(hash) = hash else {
            return Ok(None);
        };
        if !self.passwords.verify(password, &hash)? {
            return Ok(None);
        }
        self.fetch_one_where("email = $1", &email).await
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, id: UserId, changes: &ProfileChanges) -> RepoResult<()> {
        // NULL leaves a column alone; an empty avatar clears it
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                avatar     = CASE WHEN $4::TEXT IS NULL THEN avatar ELSE NULLIF($4, '') END
            WHERE id = $1
            ",
        )
        .bind(id.to_string())
        .bind(changes.first_name.as_deref().map(str::trim))
        .bind(changes.last_name.as_deref().map(str::trim))
        .bind(changes.avatar.as_deref().map(str::trim))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_presence(
        &self,
        id: UserId,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET status = $2, last_seen = GREATEST(last_seen, $3)
            WHERE id = $1
            ",
        )
        .bind(id.to_string())
        .bind(status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn expire_inactive(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, String>(
            r"
            UPDATE users
            SET status = 'offline'
            WHERE status IN ('online', 'away') AND last_seen < $1
            RETURNING id
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        ids.iter()
            .map(|raw| {
                UserId::parse(raw)
                    .map_err(|e| DomainError::StoreError(format!("corrupt account id {raw}: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self, old_password, new_password))]
    async fn change_password(
        &self,
        id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> RepoResult<()> {
        let current = self.password_hash(id).await?;
        if !self.passwords.verify(old_password, &current)? {
            return Err(DomainError::InvalidCredentials);
        }
        let replacement = self.passwords.hash(new_password)?;

        // Compare-and-swap so a concurrent change cannot be silently overwritten
        let result = sqlx::query(
            "UPDATE users SET password_hash = $3 WHERE id = $1 AND password_hash = $2",
        )
        .bind(id.to_string())
        .bind(&current)
        .bind(&replacement)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::InvalidCredentials);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_verification_email(&self, id: UserId) -> RepoResult<()> {
        let user = self.find_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
        let address = user
            .primary_email()
            .ok_or_else(|| DomainError::NotificationError(format!("{id} has no email")))?;

        // Rows here are picked up by the mail relay
        sqlx::query(
            r"
            INSERT INTO email_verifications (token, user_id, address, created_at)
            VALUES ($1, $2, $3, NOW())
            ",
        )
        .bind(uuid::Uuid::new_v4().simple().to_string())
        .bind(id.to_string())
        .bind(address)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::NotificationError(e.to_string()))?;

        tracing::info!(user_id = %id, "Verification email queued");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_users(&self, filter: &UserFilter, limit: usize) -> RepoResult<Vec<User>> {
        let statuses: Option<Vec<String>> = filter
            .statuses
            .as_ref()
            .map(|s| s.iter().map(|st| st.as_str().to_string()).collect());

        let sql = format!(
            r"
            SELECT {ACCOUNT_COLUMNS}
            FROM users
            WHERE ($1::TEXT IS NULL OR id = $1)
              AND ($2::TEXT IS NULL OR id <> $2)
              AND ($3::TEXT[] IS NULL OR status = ANY($3))
            ORDER BY last_seen DESC
            LIMIT $4
            "
        );

        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(filter.only.map(|id| id.to_string()))
            .bind(filter.exclude.map(|id| id.to_string()))
            .bind(statuses)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}
