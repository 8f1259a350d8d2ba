//! Ports - interfaces the domain needs from its collaborators

mod account_store;
mod clock;

pub use account_store::{AccountStore, RepoResult, UserFilter};
pub use clock::{Clock, ManualClock, SystemClock};
