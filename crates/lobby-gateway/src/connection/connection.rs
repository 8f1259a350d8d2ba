//! Individual WebSocket connection

use crate::protocol::GatewayMessage;
use lobby_core::UserId;
use lobby_service::{CallerContext, ConnectionId, ViewQuery};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};

/// An open subscription and the snapshot last sent for it.
///
/// A subscription is pending until its first snapshot has gone out. Refreshes
/// requested while pending only mark it dirty.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub query: ViewQuery,
    pub last_snapshot: Option<Value>,
    ready: bool,
    dirty: bool,
    /// Last refresh ticket handed out
    issued: u64,
    /// Ticket of the newest snapshot delivered
    applied: u64,
}

impl Subscription {
    fn pending(query: ViewQuery) -> Self {
        Self {
            query,
            last_snapshot: None,
            ready: false,
            dirty: false,
            issued: 0,
            applied: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// A single WebSocket connection
pub struct Connection {
    id: ConnectionId,

    /// Who is logged in on this connection
    caller: RwLock<CallerContext>,

    /// Channel to send messages to the WebSocket
    sender: mpsc::Sender<GatewayMessage>,

    /// Last frame of any kind received from the client
    last_heartbeat: RwLock<Instant>,

    /// Open subscriptions by client-chosen id
    subscriptions: Mutex<HashMap<String, Subscription>>,

    created_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<GatewayMessage>) -> Arc<Self> {
        Arc::new(Self {
            id,
            caller: RwLock::new(CallerContext::anonymous(id)),
            sender,
            last_heartbeat: RwLock::new(Instant::now()),
            subscriptions: Mutex::new(HashMap::new()),
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Snapshot of the caller identity for one operation
    pub async fn caller(&self) -> CallerContext {
        self.caller.read().await.clone()
    }

    pub async fn user_id(&self) -> Option<UserId> {
        self.caller.read().await.user_id
    }

    pub async fn is_authenticated(&self) -> bool {
        self.caller.read().await.is_authenticated()
    }

    /// Attach a login to this connection, replacing any previous one
    pub async fn sign_in(&self, user_id: UserId, session_id: String) {
        *self.caller.write().await = CallerContext::authenticated(self.id, user_id, session_id);
    }

    pub async fn sign_out(&self) {
        *self.caller.write().await = CallerContext::anonymous(self.id);
    }

    // === Heartbeats ===

    pub async fn record_heartbeat(&self) {
        *self.last_heartbeat.write().await = Instant::now();
    }

    pub async fn time_since_heartbeat(&self) -> std::time::Duration {
        self.last_heartbeat.read().await.elapsed()
    }

    // === Subscriptions ===

    /// Register a pending subscription. `false` if the id is already in use.
    pub async fn add_subscription(&self, sub_id: &str, query: ViewQuery) -> bool {
        let mut subs = self.subscriptions.lock().await;
        if subs.contains_key(sub_id) {
            return false;
        }
        subs.insert(sub_id.to_string(), Subscription::pending(query));
        true
    }

    /// Send the first snapshot and READY for a pending subscription.
    ///
    /// Returns `None` if the subscription is gone, otherwise whether a refresh was
    /// requested while the snapshot was being computed.
    pub async fn activate_subscription(
        &self,
        sub_id: &str,
        publication: &str,
        snapshot: Value,
    ) -> Result<Option<bool>, mpsc::error::SendError<GatewayMessage>> {
        let mut subs = self.subscriptions.lock().await;
        let Some(sub) = subs.get_mut(sub_id) else {
            return Ok(None);
        };
        sub.ready = true;
        sub.last_snapshot = Some(snapshot.clone());
        let dirty = std::mem::take(&mut sub.dirty);

        // Sent under the lock so no refresh can overtake the first snapshot
        self.sender
            .send(GatewayMessage::dispatch(sub_id, publication, snapshot))
            .await?;
        self.sender.send(GatewayMessage::ready(sub_id)).await?;
        Ok(Some(dirty))
    }

    /// Start a refresh. Pending subscriptions are only marked dirty and get no ticket.
    pub async fn begin_refresh(&self, sub_id: &str) -> Option<u64> {
        let mut subs = self.subscriptions.lock().await;
        let sub = subs.get_mut(sub_id)?;
        if !sub.ready {
            sub.dirty = true;
            return None;
        }
        sub.issued += 1;
        Some(sub.issued)
    }

    /// Deliver a refreshed snapshot.
    ///
    /// Dropped if a later ticket was already delivered or nothing changed.
    /// Returns whether a DISPATCH was sent.
    pub async fn deliver_refresh(
        &self,
        sub_id: &str,
        ticket: u64,
        publication: &str,
        snapshot: Value,
    ) -> Result<bool, mpsc::error::SendError<GatewayMessage>> {
        let mut subs = self.subscriptions.lock().await;
        let Some(sub) = subs.get_mut(sub_id) else {
            return Ok(false);
        };
        if ticket <= sub.applied {
            return Ok(false);
        }
        sub.applied = ticket;
        if sub.last_snapshot.as_ref() == Some(&snapshot) {
            return Ok(false);
        }
        sub.last_snapshot = Some(snapshot.clone());

        self.sender
            .send(GatewayMessage::dispatch(sub_id, publication, snapshot))
            .await?;
        Ok(true)
    }

    pub async fn remove_subscription(&self, sub_id: &str) -> Option<Subscription> {
        self.subscriptions.lock().await.remove(sub_id)
    }

    /// Remove every subscription, returning their ids
    pub async fn clear_subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .await
            .drain()
            .map(|(id, _)| id)
            .collect()
    }

    pub async fn subscriptions(&self) -> Vec<(String, ViewQuery)> {
        self.subscriptions
            .lock()
            .await
            .iter()
            .map(|(id, sub)| (id.clone(), sub.query))
            .collect()
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    // === Outgoing ===

    /// Send a message to this connection
    pub async fn send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::SendError<GatewayMessage>> {
        self.sender.send(message).await
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
