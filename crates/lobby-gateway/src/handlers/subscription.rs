//! Subscribe (op 4) and Unsubscribe (op 5) handlers

use super::{HandlerError, HandlerResult};
use crate::broadcast::SubscriptionRefresher;
use crate::connection::Connection;
use crate::protocol::{CallError, CloseCode, GatewayMessage};
use crate::server::GatewayState;
use lobby_service::dto::AllUsersParams;
use lobby_service::{Publication, ViewOutcome, ViewQuery, ViewService};
use serde_json::Value;
use std::sync::Arc;

/// Handles SUBSCRIBE and UNSUBSCRIBE frames
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    /// Open a view: first snapshot, then READY. Refusals answer with NOSUB.
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        let sub_id = message.id.clone().ok_or(HandlerError::MissingField("id"))?;
        let name = message.t.clone().ok_or(HandlerError::MissingField("t"))?;

        let Ok(publication) = name.parse::<Publication>() else {
            let error = CallError::unknown("publication", &name);
            connection.send(GatewayMessage::nosub(sub_id, Some(&error))).await?;
            return Ok(None);
        };
        let params: AllUsersParams = match message.params_or_default() {
            Ok(params) => params,
            Err(e) => {
                let error = CallError::bad_params(e.to_string());
                connection.send(GatewayMessage::nosub(sub_id, Some(&error))).await?;
                return Ok(None);
            }
        };
        let query = ViewQuery::new(publication, params);

        // Registered before the first query so changes made meanwhile are not missed
        if !connection.add_subscription(&sub_id, query).await {
            tracing::debug!(connection = %connection.id(), sub_id = %sub_id, "Duplicate subscription id ignored");
            return Ok(None);
        }

        let caller = connection.caller().await;
        let outcome = match ViewService::new(state.service_context())
            .subscribe(&caller, query)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                connection.remove_subscription(&sub_id).await;
                tracing::debug!(
                    connection = %connection.id(),
                    publication = %publication,
                    code = e.error_code(),
                    "Subscription refused"
                );
                let error = CallError::from(&e);
                connection.send(GatewayMessage::nosub(sub_id, Some(&error))).await?;
                return Ok(None);
            }
        };

        match outcome {
            // Empty view that ends immediately
            ViewOutcome::Unauthenticated => {
                connection.remove_subscription(&sub_id).await;
                connection
                    .send(GatewayMessage::dispatch(&sub_id, publication.as_str(), Value::Array(vec![])))
                    .await?;
                connection.send(GatewayMessage::ready(&sub_id)).await?;
                connection.send(GatewayMessage::nosub(sub_id, None)).await?;
            }
            ViewOutcome::Records(records) => {
                let snapshot = match serde_json::to_value(&records) {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        connection.remove_subscription(&sub_id).await;
                        return Err(HandlerError::Internal(e.to_string()));
                    }
                };

                let dirty = connection
                    .activate_subscription(&sub_id, publication.as_str(), snapshot)
                    .await?;
                if dirty == Some(true) {
                    tracing::trace!(connection = %connection.id(), sub_id = %sub_id, "Changed while subscribing");
                    SubscriptionRefresher::refresh(state.service_context(), connection, &sub_id, query)
                        .await;
                }
            }
        }

        Ok(None)
    }

    /// Close a view. Unknown ids are answered too, so the client always gets NOSUB.
    pub async fn unsubscribe(
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        let sub_id = message.id.ok_or(HandlerError::MissingField("id"))?;

        if connection.remove_subscription(&sub_id).await.is_some() {
            tracing::trace!(connection = %connection.id(), sub_id = %sub_id, "Unsubscribed");
        }
        connection.send(GatewayMessage::nosub(sub_id, None)).await?;
        Ok(None)
    }
}
