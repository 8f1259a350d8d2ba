//! # lobby-gateway
//!
//! WebSocket transport for the account and presence services: method calls, live
//! read views, heartbeats, and the connection-close hook that drives presence.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, run_server, GatewayState};
