//! Subscription refresher
//!
//! One loop per connection listens on the service event channel. For every open
//! subscription an event may affect, the view is recomputed and a DISPATCH is sent
//! only when the snapshot differs from the last one sent.

use crate::connection::Connection;
use lobby_core::AccountEvent;
use lobby_service::{ServiceContext, ViewOutcome, ViewQuery, ViewService};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

pub struct SubscriptionRefresher;

impl SubscriptionRefresher {
    /// Run until the event channel closes or the connection goes away
    pub async fn run(
        ctx: &ServiceContext,
        connection: Arc<Connection>,
        mut events: broadcast::Receiver<AccountEvent>,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => Self::on_event(ctx, &connection, &event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        connection = %connection.id(),
                        skipped,
                        "Event stream lagged, refreshing every subscription"
                    );
                    Self::refresh_all(ctx, &connection).await;
                }
                Err(RecvError::Closed) => break,
            }

            if connection.is_closed() {
                break;
            }
        }
    }

    /// Refresh the subscriptions `event` can affect
    pub async fn on_event(ctx: &ServiceContext, connection: &Arc<Connection>, event: &AccountEvent) {
        let Some(viewer) = connection.user_id().await else {
            return;
        };

        for (sub_id, query) in connection.subscriptions().await {
            if query.affected_by(event, viewer) {
                Self::refresh(ctx, connection, &sub_id, query).await;
            }
        }
    }

    /// Refresh every open subscription on the connection
    pub async fn refresh_all(ctx: &ServiceContext, connection: &Arc<Connection>) {
        for (sub_id, query) in connection.subscriptions().await {
            Self::refresh(ctx, connection, &sub_id, query).await;
        }
    }

    /// Re-query one subscription and dispatch if the result changed.
    ///
    /// Each refresh takes a ticket first; a result that arrives after a newer one
    /// was delivered is dropped.
    pub async fn refresh(ctx: &ServiceContext, connection: &Arc<Connection>, sub_id: &str, query: ViewQuery) {
        let Some(ticket) = connection.begin_refresh(sub_id).await else {
            return;
        };
        let caller = connection.caller().await;

        let records = match ViewService::new(ctx).snapshot(&caller, query).await {
            Ok(ViewOutcome::Records(records)) => records,
            // Logout terminates subscriptions itself
            Ok(ViewOutcome::Unauthenticated) => return,
            Err(e) => {
                tracing::warn!(
                    connection = %connection.id(),
                    sub_id = %sub_id,
                    error = %e,
                    "Failed to refresh subscription"
                );
                return;
            }
        };

        let snapshot = match serde_json::to_value(&records) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize view records");
                return;
            }
        };

        if connection
            .deliver_refresh(sub_id, ticket, query.publication().as_str(), snapshot)
            .await
            .is_err()
        {
            tracing::debug!(connection = %connection.id(), "Connection gone during refresh");
        }
    }
}
