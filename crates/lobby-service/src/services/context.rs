//! Service context - dependency container for services

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lobby_common::{PresenceConfig, SessionTokenService};
use lobby_core::{AccountEvent, AccountStore, Clock, SystemClock};
use tokio::sync::broadcast;

use super::caller::CallerContext;
use super::error::{ServiceError, ServiceResult};
use super::operation::Operation;
use super::rate_limit::RateLimiter;
use super::sessions::SessionRegistry;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Dependencies shared by every service call.
///
/// Cloning is cheap; all state lives behind `Arc`s, so clones see the same rate-limit
/// counters, revocations, and event channel.
#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    rate_limiter: Arc<RateLimiter>,
    tokens: Arc<SessionTokenService>,
    sessions: Arc<SessionRegistry>,
    events: broadcast::Sender<AccountEvent>,
    presence: PresenceConfig,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Collaborators ===

    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    /// Owned handle for work that outlives the call (e.g. spawned notifications)
    pub fn store_handle(&self) -> Arc<dyn AccountStore> {
        Arc::clone(&self.store)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub fn tokens(&self) -> &SessionTokenService {
        self.tokens.as_ref()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.sessions.as_ref()
    }

    pub fn presence_config(&self) -> PresenceConfig {
        self.presence
    }

    // === Rate limiting ===

    /// Meter one attempt of `op` from the caller's connection
    pub fn throttle(&self, caller: &CallerContext, op: Operation) -> ServiceResult<()> {
        self.rate_limiter
            .check(caller.connection_id, op)
            .map_err(|e| ServiceError::RateLimited {
                retry_after: e.retry_after,
            })
    }

    // === Change notifications ===

    /// Publish an event; having no listeners is fine
    pub fn publish(&self, event: AccountEvent) {
        tracing::trace!(event = event.event_type(), "Publishing account event");
        let _ = self.events.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("store", &"dyn AccountStore")
            .field("rate_limiter", &self.rate_limiter)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceContext`]. The store and token service are required.
pub struct ServiceContextBuilder {
    store: Option<Arc<dyn AccountStore>>,
    clock: Option<Arc<dyn Clock>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    tokens: Option<Arc<SessionTokenService>>,
    presence: PresenceConfig,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
            rate_limiter: None,
            tokens: None,
            presence: PresenceConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn AccountStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the default rules; the limiter should share the context's clock
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn tokens(mut self, tokens: Arc<SessionTokenService>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn presence(mut self, presence: PresenceConfig) -> Self {
        self.presence = presence;
        self
    }

    pub fn build(self) -> ServiceResult<ServiceContext> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::with_defaults(Arc::clone(&clock))));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(ServiceContext {
            store: self
                .store
                .ok_or_else(|| ServiceError::internal("store is required"))?,
            tokens: self
                .tokens
                .ok_or_else(|| ServiceError::internal("token service is required"))?,
            clock,
            rate_limiter,
            sessions: Arc::new(SessionRegistry::new()),
            events,
            presence: self.presence,
        })
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
