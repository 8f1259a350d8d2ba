//! Op code handlers
//!
//! Handles incoming WebSocket frames based on their operation code.

mod error;
mod heartbeat;
mod method;
mod subscription;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use method::MethodHandler;
pub use subscription::SubscriptionHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client frames to the appropriate handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                connection = %connection.id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        // Any frame counts as a sign of life
        connection.record_heartbeat().await;

        match message.op {
            OpCode::Heartbeat => HeartbeatHandler::handle(connection).await,
            OpCode::Method => MethodHandler::handle(state, connection, message).await,
            OpCode::Subscribe => SubscriptionHandler::subscribe(state, connection, message).await,
            OpCode::Unsubscribe => SubscriptionHandler::unsubscribe(connection, message).await,
            // These ops should never reach here due to is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}
