//! # lobby-service
//!
//! Application layer: account operations, the presence state machine, rate limiting,
//! and the read views served to subscribers.
//!
//! Every operation takes the caller's [`CallerContext`] explicitly; nothing here reads
//! ambient session state.

pub mod dto;
pub mod services;

pub use services::{
    AccountService, AuthService, CallerContext, ConnectionId, ErrorKind, LoginOutcome, Method,
    Operation, PresenceService, PresenceSweeper, Publication, RateLimitExceeded, RateLimitRule,
    RateLimiter, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
    SessionRegistry, ViewOutcome, ViewQuery, ViewService,
};
