//! Live view refresh
//!
//! Turns account events into fresh snapshots for open subscriptions.

mod dispatcher;

pub use dispatcher::SubscriptionRefresher;
