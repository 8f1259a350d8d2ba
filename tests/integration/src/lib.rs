//! Integration test utilities for the lobby gateway
//!
//! This crate provides helpers for running end-to-end tests against
//! the WebSocket gateway over a real socket.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
