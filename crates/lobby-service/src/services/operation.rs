//! Callable method and publication names

use std::fmt;
use std::str::FromStr;

/// Remote methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Register,
    Login,
    Logout,
    UpdateProfile,
    UpdateStatus,
    ChangePassword,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Register,
        Method::Login,
        Method::Logout,
        Method::UpdateProfile,
        Method::UpdateStatus,
        Method::ChangePassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "users.register",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::UpdateProfile => "users.updateProfile",
            Self::UpdateStatus => "users.updateStatus",
            Self::ChangePassword => "users.changePassword",
        }
    }
}

impl FromStr for Method {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscribable read views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Publication {
    UserData,
    OnlineUsers,
    AllUsers,
}

impl Publication {
    pub const ALL: [Publication; 3] = [
        Publication::UserData,
        Publication::OnlineUsers,
        Publication::AllUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserData => "userData",
            Self::OnlineUsers => "onlineUsers",
            Self::AllUsers => "allUsers",
        }
    }
}

impl FromStr for Publication {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the rate limiter can meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Call(Method),
    Subscribe(Publication),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name: {0}")]
pub struct UnknownName(pub String);
