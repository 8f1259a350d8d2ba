//! Domain entities

mod user;

pub use user::{EmailAddress, NewAccount, Profile, ProfileChanges, User};
