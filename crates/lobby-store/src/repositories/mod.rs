//! `AccountStore` implementations

mod error;
mod memory;
mod postgres;

pub use memory::{MemoryAccountStore, SentVerification};
pub use postgres::PgAccountStore;
