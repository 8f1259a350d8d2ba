//! Account events
//!
//! Published on the service's broadcast channel after a store write succeeds.
//! The gateway uses them to decide which live subscriptions need a fresh snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{UserId, UserStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountEvent {
    AccountCreated {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    ProfileUpdated {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        user_id: UserId,
        status: UserStatus,
        last_seen: DateTime<Utc>,
    },
    /// Inactive users swept offline in one batch
    PresenceExpired {
        user_ids: Vec<UserId>,
        timestamp: DateTime<Utc>,
    },
}

impl AccountEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => "ACCOUNT_CREATED",
            Self::ProfileUpdated { .. } => "PROFILE_UPDATED",
            Self::StatusChanged { .. } => "STATUS_CHANGED",
            Self::PresenceExpired { .. } => "PRESENCE_EXPIRED",
        }
    }

    /// Whether this event touched the given user
    pub fn concerns(&self, id: UserId) -> bool {
        match self {
            Self::AccountCreated { user_id, .. }
            | Self::ProfileUpdated { user_id, .. }
            | Self::StatusChanged { user_id, .. } => *user_id == id,
            Self::PresenceExpired { user_ids, .. } => user_ids.contains(&id),
        }
    }
}
