//! Presence service
//!
//! Drives each user's `status`/`lastSeen` pair through four transitions: login,
//! explicit status update, connection close, and the inactivity sweep. Registration
//! sets the initial state as part of record creation and does not come through here.

use chrono::Duration;
use lobby_core::{AccountEvent, DomainError, UserId, UserStatus};
use tracing::{debug, error, info, instrument, warn};

use crate::dto::SuccessResponse;

use super::caller::CallerContext;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::operation::{Method, Operation};

pub struct PresenceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PresenceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Successful login: `online`, last seen now.
    ///
    /// Not metered by the account rule; the login rule already covered the attempt.
    #[instrument(skip(self))]
    pub async fn mark_online(&self, user_id: UserId) -> ServiceResult<()> {
        self.record(user_id, UserStatus::Online).await?;
        Ok(())
    }

    /// Client-requested status change
    #[instrument(skip(self), fields(connection = %caller.connection_id))]
    pub async fn update_status(
        &self,
        caller: &CallerContext,
        status: &str,
    ) -> ServiceResult<SuccessResponse> {
        self.ctx
            .throttle(caller, Operation::Call(Method::UpdateStatus))?;
        let user_id = caller.require_user()?;
        let status: UserStatus = status
            .parse()
            .map_err(|_| DomainError::InvalidStatus(status.to_string()))?;

        self.record(user_id, status).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to update status");
            ServiceError::StatusUpdateFailed
        })?;

        info!(user_id = %user_id, status = %status, "Status updated");
        Ok(SuccessResponse::ok())
    }

    /// Transport-level disconnect. Best effort: failures are logged, never returned.
    #[instrument(skip(self), fields(connection = %caller.connection_id))]
    pub async fn connection_closed(&self, caller: &CallerContext) {
        self.ctx
            .rate_limiter()
            .forget_connection(caller.connection_id);

        let Some(user_id) = caller.user_id else {
            debug!("Anonymous connection closed");
            return;
        };

        match self.record(user_id, UserStatus::Offline).await {
            Ok(()) => info!(user_id = %user_id, "User went offline on disconnect"),
            Err(e) => error!(user_id = %user_id, error = %e, "Failed to record disconnect"),
        }
    }

    /// Take every online/away user not seen within the inactivity timeout offline.
    ///
    /// Idempotent. Returns the users that changed; failures are logged and yield none.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Vec<UserId> {
        let timeout = self.ctx.presence_config().inactivity_timeout;
        let Ok(timeout) = Duration::from_std(timeout) else {
            warn!(?timeout, "Inactivity timeout out of range, skipping sweep");
            return Vec::new();
        };
        let now = self.ctx.now();
        let cutoff = now - timeout;

        match self.ctx.store().expire_inactive(cutoff).await {
            Ok(expired) if expired.is_empty() => {
                debug!("No inactive users");
                expired
            }
            Ok(expired) => {
                info!(count = expired.len(), "Inactive users set offline");
                self.ctx.publish(AccountEvent::PresenceExpired {
                    user_ids: expired.clone(),
                    timestamp: now,
                });
                expired
            }
            Err(e) => {
                error!(error = %e, "Inactivity sweep failed");
                Vec::new()
            }
        }
    }

    /// Write status and last-seen together, then announce it
    async fn record(&self, user_id: UserId, status: UserStatus) -> Result<(), DomainError> {
        let now = self.ctx.now();
        self.ctx.store().set_presence(user_id, status, now).await?;
        self.ctx.publish(AccountEvent::StatusChanged {
            user_id,
            status,
            last_seen: now,
        });
        Ok(())
    }
}
