//! Account events - emitted whenever a user record changes

mod account_event;

pub use account_event::AccountEvent;
