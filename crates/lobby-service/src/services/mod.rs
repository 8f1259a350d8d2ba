//! Business logic services
//!
//! Services borrow a [`ServiceContext`] for the duration of a call and are cheap to
//! construct per request.

pub mod account;
pub mod auth;
pub mod caller;
pub mod context;
pub mod error;
pub mod operation;
pub mod presence;
pub mod rate_limit;
pub mod sessions;
pub mod sweeper;
pub mod views;

pub use account::AccountService;
pub use auth::{AuthService, LoginOutcome};
pub use caller::{CallerContext, ConnectionId};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use operation::{Method, Operation, Publication};
pub use presence::PresenceService;
pub use rate_limit::{RateLimitExceeded, RateLimitRule, RateLimiter};
pub use sessions::SessionRegistry;
pub use sweeper::PresenceSweeper;
pub use views::{ViewOutcome, ViewQuery, ViewService};
