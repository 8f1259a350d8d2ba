//! Connection management
//!
//! Tracks live WebSocket connections, who is logged in on each, and their open
//! subscriptions.

mod connection;
mod manager;

pub use connection::{Connection, Subscription};
pub use manager::ConnectionManager;
