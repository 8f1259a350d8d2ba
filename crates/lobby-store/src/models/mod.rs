//! Database models

mod account;

pub use account::AccountRow;
