//! Connection manager
//!
//! Tracks all active WebSocket connections using DashMap for thread-safe access.

use super::Connection;
use crate::protocol::GatewayMessage;
use dashmap::DashMap;
use lobby_core::UserId;
use lobby_service::ConnectionId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// Active connections by id
    connections: DashMap<ConnectionId, Arc<Connection>>,

    /// User id to the connections logged in as that user
    user_connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection under a fresh id
    pub fn add_connection(&self, sender: mpsc::Sender<GatewayMessage>) -> Arc<Connection> {
        let connection = Connection::new(ConnectionId::generate(), sender);
        self.connections
            .insert(connection.id(), Arc::clone(&connection));

        tracing::debug!(connection = %connection.id(), "Connection added");
        connection
    }

    /// Remove a connection and its user mapping
    pub async fn remove_connection(&self, id: ConnectionId) {
        if let Some((_, connection)) = self.connections.remove(&id) {
            if let Some(user_id) = connection.user_id().await {
                self.detach_user(user_id, id);
            }
            tracing::debug!(connection = %id, "Connection removed");
        }
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|r| Arc::clone(&r))
    }

    /// Log a user in on a connection
    pub async fn authenticate_connection(
        &self,
        connection: &Connection,
        user_id: UserId,
        session_id: String,
    ) {
        if let Some(previous) = connection.user_id().await {
            self.detach_user(previous, connection.id());
        }
        connection.sign_in(user_id, session_id).await;
        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(connection.id());

        tracing::debug!(connection = %connection.id(), user_id = %user_id, "Connection authenticated");
    }

    /// Log the current user out of a connection
    pub async fn sign_out_connection(&self, connection: &Connection) {
        if let Some(user_id) = connection.user_id().await {
            self.detach_user(user_id, connection.id());
        }
        connection.sign_out().await;
    }

    /// Number of connections logged in as `user_id`
    pub fn user_connection_count(&self, user_id: UserId) -> usize {
        self.user_connections
            .get(&user_id)
            .map_or(0, |conns| conns.len())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn detach_user(&self, user_id: UserId, id: ConnectionId) {
        self.user_connections
            .remove_if_mut(&user_id, |_, conns| {
                conns.remove(&id);
                conns.is_empty()
            });
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .finish()
    }
}
