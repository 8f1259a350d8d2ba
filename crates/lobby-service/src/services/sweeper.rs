//! Periodic inactivity sweep
//!
//! Owned background task: started once at process start and stopped through a
//! `watch` channel at shutdown. Each tick runs the presence sweep and drops expired
//! rate-limit buckets and session revocations. A failing tick never ends the loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use lobby_core::UserId;

use super::context::ServiceContext;
use super::presence::PresenceService;

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: Vec<UserId>,
    pub buckets_purged: usize,
    pub sessions_purged: usize,
}

pub struct PresenceSweeper {
    ctx: ServiceContext,
    period: Duration,
}

impl PresenceSweeper {
    /// Sweep on the context's configured interval
    pub fn new(ctx: ServiceContext) -> Self {
        let period = ctx.presence_config().sweep_interval;
        Self { ctx, period }
    }

    pub fn with_period(ctx: ServiceContext, period: Duration) -> Self {
        Self { ctx, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One sweep plus housekeeping
    pub async fn run_once(&self) -> SweepReport {
        let expired = PresenceService::new(&self.ctx).sweep().await;
        let buckets_purged = self.ctx.rate_limiter().purge_expired();
        let sessions_purged = self.ctx.sessions().purge_expired(self.ctx.now());

        if buckets_purged > 0 || sessions_purged > 0 {
            debug!(buckets_purged, sessions_purged, "Housekeeping done");
        }

        SweepReport {
            expired,
            buckets_purged,
            sessions_purged,
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so the first sweep is one period in
            ticker.tick().await;

            info!(period_secs = self.period.as_secs(), "Presence sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Presence sweeper stopped");
        })
    }
}
