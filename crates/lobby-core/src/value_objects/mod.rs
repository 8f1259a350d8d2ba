//! Value objects - immutable types identified by their value

mod status;
mod user_id;

pub use status::{UserStatus, UserStatusParseError};
pub use user_id::{UserId, UserIdParseError};
