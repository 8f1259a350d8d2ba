//! Caller identity passed into every operation

use std::fmt;

use lobby_core::UserId;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};

/// Transport connection a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Who is calling: the connection, and the user logged in on it if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub connection_id: ConnectionId,
    pub user_id: Option<UserId>,
    /// Session the resume token was issued for
    pub session_id: Option<String>,
}

impl CallerContext {
    pub fn anonymous(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            user_id: None,
            session_id: None,
        }
    }

    pub fn authenticated(
        connection_id: ConnectionId,
        user_id: UserId,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            connection_id,
            user_id: Some(user_id),
            session_id: Some(session_id.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The logged-in user, or `NOT_AUTHENTICATED`
    pub fn require_user(&self) -> ServiceResult<UserId> {
        self.user_id.ok_or(ServiceError::NotAuthenticated)
    }
}
