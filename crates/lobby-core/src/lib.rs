//! # lobby-core
//!
//! Domain layer containing the account entity, presence status, validation rules,
//! store traits, and change notifications.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod validation;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{EmailAddress, NewAccount, Profile, ProfileChanges, User};
pub use error::DomainError;
pub use events::AccountEvent;
pub use traits::{AccountStore, Clock, ManualClock, RepoResult, SystemClock, UserFilter};
pub use validation::{validate_email, validate_name, validate_password};
pub use value_objects::{UserId, UserIdParseError, UserStatus, UserStatusParseError};
