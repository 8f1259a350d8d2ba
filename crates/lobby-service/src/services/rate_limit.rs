//! Per-connection rate limiting
//!
//! Each rule keeps an independent fixed-window counter per connection. An attempt
//! increments the counter of every rule it matches and is rejected if any of them
//! went over its limit, so the stricter login and register rules stack on top of
//! the grouped account rule instead of replacing it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use lobby_core::Clock;

use super::caller::ConnectionId;
use super::operation::{Method, Operation};

/// A (operation class, max attempts, window) tuple
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pub name: &'static str,
    pub max_attempts: u32,
    pub window: Duration,
    matches: fn(Operation) -> bool,
}

impl RateLimitRule {
    pub fn new(
        name: &'static str,
        max_attempts: u32,
        window: Duration,
        matches: fn(Operation) -> bool,
    ) -> Self {
        Self {
            name,
            max_attempts,
            window,
            matches,
        }
    }

    pub fn applies_to(&self, op: Operation) -> bool {
        (self.matches)(op)
    }

    /// Rules guarding account operations and subscriptions
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("account", 5, Duration::seconds(60), |op| {
                matches!(
                    op,
                    Operation::Call(
                        Method::Register
                            | Method::UpdateProfile
                            | Method::UpdateStatus
                            | Method::ChangePassword
                    )
                )
            }),
            Self::new("login", 3, Duration::seconds(60), |op| {
                op == Operation::Call(Method::Login)
            }),
            Self::new("register", 2, Duration::seconds(300), |op| {
                op == Operation::Call(Method::Register)
            }),
            Self::new("subscribe", 10, Duration::seconds(60), |op| {
                matches!(op, Operation::Subscribe(_))
            }),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BucketKey {
    rule: usize,
    connection: ConnectionId,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rate limit '{rule}' exceeded, retry in {retry_after:?}")]
pub struct RateLimitExceeded {
    pub rule: &'static str,
    pub retry_after: std::time::Duration,
}

pub struct RateLimiter {
    rules: Vec<RateLimitRule>,
    buckets: DashMap<BucketKey, Bucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(rules: Vec<RateLimitRule>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            buckets: DashMap::new(),
            clock,
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(RateLimitRule::defaults(), clock)
    }

    pub fn rules(&self) -> &[RateLimitRule] {
        &self.rules
    }

    /// Count an attempt and decide whether it may proceed
    pub fn check(&self, connection: ConnectionId, op: Operation) -> Result<(), RateLimitExceeded> {
        let now = self.clock.now();
        let mut rejected: Option<RateLimitExceeded> = None;

        for (idx, rule) in self.rules.iter().enumerate() {
            if !rule.applies_to(op) {
                continue;
            }

            // The entry guard makes reset, increment, and compare one step
            let mut bucket = self
                .buckets
                .entry(BucketKey {
                    rule: idx,
                    connection,
                })
                .or_insert(Bucket {
                    count: 0,
                    window_start: now,
                });

            if now >= bucket.window_start + rule.window {
                bucket.count = 0;
                bucket.window_start = now;
            }
            bucket.count = bucket.count.saturating_add(1);

            if bucket.count > rule.max_attempts {
                let retry_after = (bucket.window_start + rule.window - now)
                    .to_std()
                    .unwrap_or_default();
                if rejected
                    .as_ref()
                    .is_none_or(|r| retry_after > r.retry_after)
                {
                    rejected = Some(RateLimitExceeded {
                        rule: rule.name,
                        retry_after,
                    });
                }
            }
        }

        match rejected {
            Some(exceeded) => {
                tracing::debug!(
                    connection = %connection,
                    rule = exceeded.rule,
                    "Rate limit exceeded"
                );
                Err(exceeded)
            }
            None => Ok(()),
        }
    }

    /// Drop buckets whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|key, bucket| {
            self.rules
                .get(key.rule)
                .is_some_and(|rule| now < bucket.window_start + rule.window)
        });
        before.saturating_sub(self.buckets.len())
    }

    /// Drop every bucket belonging to a closed connection
    pub fn forget_connection(&self, connection: ConnectionId) {
        self.buckets.retain(|key, _| key.connection != connection);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rules", &self.rules.len())
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}
