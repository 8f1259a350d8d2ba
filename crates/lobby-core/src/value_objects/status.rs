//! Presence status advertised by a user

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Advertised presence of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User is connected and active
    Online,
    /// User is connected but stepped away (only set explicitly by the client)
    Away,
    /// User is disconnected or timed out
    #[default]
    Offline,
}

impl UserStatus {
    /// Statuses that count as present in the online users view and the inactivity sweep
    pub const PRESENT: [UserStatus; 2] = [UserStatus::Online, UserStatus::Away];

    /// Check if this status counts as present (online or away)
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Online | Self::Away)
    }

    /// Wire/storage representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when a status string is not one of the enumerated values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct UserStatusParseError(pub String);

impl FromStr for UserStatus {
    type Err = UserStatusParseError;

    /// Exact match only; `"Online"` is rejected just like `"busy"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            _ => Err(UserStatusParseError(s.to_string())),
        }
    }
}
