//! Account database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use lobby_core::entities::{EmailAddress, Profile, User};
use lobby_core::error::DomainError;
use lobby_core::value_objects::{UserId, UserStatus};

/// Database model for the accounts table, minus the credential hash
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub status: String,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for User {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let id = UserId::parse(&row.id)
            .map_err(|e| DomainError::StoreError(format!("corrupt account id {}: {e}", row.id)))?;
        let status = row
            .status
            .parse::<UserStatus>()
            .map_err(|e| DomainError::StoreError(format!("corrupt status for {id}: {e}")))?;

        Ok(User {
            id,
            emails: vec![EmailAddress {
                address: row.email,
                verified: row.email_verified,
            }],
            profile: Profile {
                first_name: row.first_name,
                last_name: row.last_name,
                avatar: row.avatar,
                status,
                last_seen: row.last_seen,
            },
            created_at: row.created_at,
        })
    }
}
