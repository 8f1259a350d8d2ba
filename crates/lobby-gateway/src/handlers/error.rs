//! Handler error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Protocol-level failures. These close the connection; failed calls and refused
/// subscriptions are answered with RESULT/NOSUB frames instead.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Required frame field absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Outgoing channel is gone
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert to a close code (if applicable)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::MissingField(_) => Some(CloseCode::DecodeError),
            Self::ConnectionClosed => None,
            Self::Internal(_) => Some(CloseCode::UnknownError),
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for HandlerError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ConnectionClosed
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
