//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::broadcast::SubscriptionRefresher;
use crate::connection::Connection;
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use lobby_service::PresenceService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long queued frames get to flush once the connection is closing
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<GatewayMessage>(MESSAGE_BUFFER_SIZE);
    let connection = state.connection_manager().add_connection(tx);
    let connection_id = connection.id();

    tracing::info!(connection = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Send Hello message immediately
    let heartbeat_interval = state.heartbeat_interval();
    let hello = GatewayMessage::hello(HelloPayload::new(
        connection_id.to_string(),
        u64::try_from(heartbeat_interval.as_millis()).unwrap_or(u64::MAX),
    ));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(connection = %connection_id, "Failed to send Hello message");
            cleanup_connection(&state, &connection).await;
            return;
        }
    }

    // Receive frames from the client, one at a time
    let state_recv = state.clone();
    let connection_recv = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        return close_code;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection = %connection_id, "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                    connection_recv.record_heartbeat().await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection = %connection_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(connection = %connection_id, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    // Write queued frames; on a close signal, flush what is queued and send the close frame
    let (close_tx, mut close_rx) = oneshot::channel::<CloseCode>();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if !write_frame(&mut ws_sink, &msg).await {
                        tracing::warn!(connection = %connection_id, "Failed to send message to WebSocket");
                        return;
                    }
                }
                code = &mut close_rx => {
                    while let Ok(msg) = rx.try_recv() {
                        if !write_frame(&mut ws_sink, &msg).await {
                            return;
                        }
                    }
                    if let Ok(code) = code {
                        let frame = CloseFrame {
                            code: code.as_u16(),
                            reason: code.description().into(),
                        };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    // Close connections that stay silent for two intervals
    let connection_hb = Arc::clone(&connection);
    let mut heartbeat_task = tokio::spawn(async move {
        let timeout = heartbeat_interval * 2;
        let mut check_interval = interval(heartbeat_interval / 2);

        loop {
            check_interval.tick().await;

            let time_since = connection_hb.time_since_heartbeat().await;
            if time_since > timeout {
                tracing::warn!(
                    connection = %connection_id,
                    time_since_ms = time_since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break;
            }
        }
    });

    // Push fresh snapshots to this connection's subscriptions
    let events = state.service_context().subscribe_events();
    let state_refresh = state.clone();
    let connection_refresh = Arc::clone(&connection);
    let mut refresh_task = tokio::spawn(async move {
        SubscriptionRefresher::run(state_refresh.service_context(), connection_refresh, events).await;
    });

    // Wait for any task to complete
    let mut send_done = false;
    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        _ = &mut send_task => {
            send_done = true;
            tracing::debug!(connection = %connection_id, "Send task ended");
            None
        }
        _ = &mut heartbeat_task => Some(CloseCode::SessionTimeout),
        _ = &mut refresh_task => {
            tracing::debug!(connection = %connection_id, "Refresh task ended");
            None
        }
    };

    recv_task.abort();
    heartbeat_task.abort();
    refresh_task.abort();

    if !send_done {
        if let Some(code) = close_code {
            tracing::debug!(connection = %connection_id, close_code = %code, "Closing connection");
            let _ = close_tx.send(code);
        } else {
            drop(close_tx);
        }
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task)
            .await
            .is_err()
        {
            send_task.abort();
        }
    }

    cleanup_connection(&state, &connection).await;
}

async fn write_frame(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    msg: &GatewayMessage,
) -> bool {
    match msg.to_json() {
        Ok(json) => sink.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize gateway message");
            true
        }
    }
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), Option<CloseCode>> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(connection = %connection.id(), error = %e, "Failed to parse message");
            return Err(Some(CloseCode::DecodeError));
        }
    };

    tracing::trace!(connection = %connection.id(), op = %message.op, "Received message");

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(Some(close_code)),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(connection = %connection.id(), error = %e, "Handler error");
            Err(e.to_close_code())
        }
    }
}

/// Clean up a connection on disconnect: the user goes offline
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    tracing::info!(connection = %connection.id(), "Cleaning up connection");

    let caller = connection.caller().await;
    if let Some(user_id) = caller.user_id {
        let others = state
            .connection_manager()
            .user_connection_count(user_id)
            .saturating_sub(1);
        if others > 0 {
            tracing::debug!(user_id = %user_id, others, "User still has other connections");
        }
    }

    PresenceService::new(state.service_context())
        .connection_closed(&caller)
        .await;

    state
        .connection_manager()
        .remove_connection(connection.id())
        .await;
}
