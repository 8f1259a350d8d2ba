//! Read views
//!
//! Pull-based projections of the account store: filter, project, sort, limit.
//! Pushing updates is the transport's job; it re-runs [`ViewService::snapshot`]
//! when an [`lobby_core::AccountEvent`] says a view may have changed.

use lobby_core::{AccountEvent, UserFilter, UserId};
use tracing::{error, instrument};

use crate::dto::{AllUsersParams, OwnProfileView, UserSummary, ViewRecord};

use super::caller::CallerContext;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::operation::{Operation, Publication};

/// Hard cap on the online and all-users views
pub const MAX_VIEW_RECORDS: usize = 100;

pub const DEFAULT_ALL_USERS_LIMIT: usize = 50;

/// A publication with its parameters resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewQuery {
    UserData,
    OnlineUsers,
    AllUsers { limit: usize },
}

impl ViewQuery {
    /// Resolve parameters; the all-users limit is clamped to `0..=100`, default 50
    pub fn new(publication: Publication, params: AllUsersParams) -> Self {
        match publication {
            Publication::UserData => Self::UserData,
            Publication::OnlineUsers => Self::OnlineUsers,
            Publication::AllUsers => Self::AllUsers {
                limit: params.limit.map_or(DEFAULT_ALL_USERS_LIMIT, |limit| {
                    usize::try_from(limit.clamp(0, MAX_VIEW_RECORDS as i64)).unwrap_or(0)
                }),
            },
        }
    }

    pub fn publication(&self) -> Publication {
        match self {
            Self::UserData => Publication::UserData,
            Self::OnlineUsers => Publication::OnlineUsers,
            Self::AllUsers { .. } => Publication::AllUsers,
        }
    }

    /// Whether `event` can change what `viewer` sees through this view
    pub fn affected_by(&self, event: &AccountEvent, viewer: UserId) -> bool {
        match self {
            Self::UserData => event.concerns(viewer),
            // The viewer never appears in its own online list
            Self::OnlineUsers => match event {
                AccountEvent::AccountCreated { user_id, .. }
                | AccountEvent::ProfileUpdated { user_id, .. }
                | AccountEvent::StatusChanged { user_id, .. } => *user_id != viewer,
                AccountEvent::PresenceExpired { user_ids, .. } => {
                    user_ids.iter().any(|id| *id != viewer)
                }
            },
            Self::AllUsers { .. } => true,
        }
    }
}

/// What a subscriber gets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    Records(Vec<ViewRecord>),
    /// No session: the view is empty and ends immediately
    Unauthenticated,
}

pub struct ViewService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ViewService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a subscription: metered, then the first snapshot
    #[instrument(skip(self, caller), fields(connection = %caller.connection_id))]
    pub async fn subscribe(
        &self,
        caller: &CallerContext,
        query: ViewQuery,
    ) -> ServiceResult<ViewOutcome> {
        self.ctx
            .throttle(caller, Operation::Subscribe(query.publication()))?;
        self.snapshot(caller, query).await
    }

    /// Current records for a view. Not metered; used for refreshes.
    pub async fn snapshot(
        &self,
        caller: &CallerContext,
        query: ViewQuery,
    ) -> ServiceResult<ViewOutcome> {
        let Some(user_id) = caller.user_id else {
            return Ok(ViewOutcome::Unauthenticated);
        };

        let records = match query {
            ViewQuery::UserData => self
                .own_profile(user_id)
                .await?
                .map(ViewRecord::Own)
                .into_iter()
                .collect(),
            ViewQuery::OnlineUsers => self
                .online_users(user_id)
                .await?
                .into_iter()
                .map(ViewRecord::User)
                .collect(),
            ViewQuery::AllUsers { limit } => self
                .all_users(limit)
                .await?
                .into_iter()
                .map(ViewRecord::User)
                .collect(),
        };
        Ok(ViewOutcome::Records(records))
    }

    /// The caller's own record
    pub async fn own_profile(&self, user_id: UserId) -> ServiceResult<Option<OwnProfileView>> {
        let users = self.find(&UserFilter::only(user_id), 1).await?;
        Ok(users.first().map(OwnProfileView::from))
    }

    /// Online and away users other than the caller, most recently seen first
    pub async fn online_users(&self, user_id: UserId) -> ServiceResult<Vec<UserSummary>> {
        let users = self
            .find(&UserFilter::present().excluding(user_id), MAX_VIEW_RECORDS)
            .await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Everyone, most recently seen first
    pub async fn all_users(&self, limit: usize) -> ServiceResult<Vec<UserSummary>> {
        let users = self
            .find(&UserFilter::all(), limit.min(MAX_VIEW_RECORDS))
            .await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    async fn find(&self, filter: &UserFilter, limit: usize) -> ServiceResult<Vec<lobby_core::User>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.ctx.store().find_users(filter, limit).await.map_err(|e| {
            error!(error = %e, "View query failed");
            ServiceError::internal(e.to_string())
        })
    }
}
