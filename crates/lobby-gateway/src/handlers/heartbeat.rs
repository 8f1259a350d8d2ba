//! Heartbeat handler (op 1)

use super::HandlerResult;
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    pub async fn handle(connection: &Arc<Connection>) -> HandlerResult<Option<CloseCode>> {
        connection.record_heartbeat().await;
        tracing::trace!(connection = %connection.id(), "Heartbeat received");

        connection.send(GatewayMessage::heartbeat_ack()).await?;
        Ok(None)
    }
}
