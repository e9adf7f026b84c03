//! Renewal reconciliation loop for webhook subscriptions.
//!
//! Runs every 5 minutes. Finds subscriptions whose channels expire within
//! the next 5 minutes, re-registers each with the provider, and writes the
//! new expiry + change cursor back to the store.

mod renewal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::MonitorError;
use crate::provider::{TokenRefresher, WatchRegistrar};
use crate::store::SubscriptionStore;

const TICK_INTERVAL_SECS: u64 = 5 * 60;
const EXPIRY_WINDOW_MINUTES: i64 = 5;

/// Per-tick counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickStats {
    pub renewed: usize,
    pub abandoned: usize,
    pub invalid: usize,
}

/// Orchestrates subscription renewal over injected service boundaries.
pub struct Monitor {
    store: Arc<dyn SubscriptionStore>,
    registrar: Arc<dyn WatchRegistrar>,
    refresher: Arc<dyn TokenRefresher>,
    running: AtomicBool,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        registrar: Arc<dyn WatchRegistrar>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            store,
            registrar,
            refresher,
            running: AtomicBool::new(false),
        }
    }

    /// Execute one renewal tick.
    ///
    /// Safe to invoke repeatedly from any scheduler: returns `None` without
    /// doing any work while a previous tick is still in flight.
    pub async fn run_once(&self) -> Option<TickStats> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Previous renewal run still in progress; skipping tick");
            return None;
        }

        let stats = self.tick().await;
        self.running.store(false, Ordering::SeqCst);
        Some(stats)
    }

    async fn tick(&self) -> TickStats {
        let mut stats = TickStats::default();
        let threshold = Utc::now() + chrono::Duration::minutes(EXPIRY_WINDOW_MINUTES);

        let categories = match self.store.list_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                error!("Failed to enumerate subscription categories: {e}");
                return stats;
            }
        };

        for category in categories {
            let expiring = match self.store.find_expiring(&category, threshold).await {
                Ok(subs) => subs,
                Err(e) => {
                    // One bad category must not stall the rest of the tick.
                    error!("Failed to query expiring subscriptions in {category}: {e}");
                    continue;
                }
            };

            if expiring.is_empty() {
                continue;
            }

            info!(
                "Found {} expiring subscription(s) in {category}",
                expiring.len()
            );

            for sub in expiring {
                match renewal::renew(
                    self.registrar.as_ref(),
                    self.refresher.as_ref(),
                    self.store.as_ref(),
                    &sub,
                )
                .await
                {
                    Ok(()) => stats.renewed += 1,
                    Err(MonitorError::Validation(msg)) => {
                        warn!("Skipping invalid subscription {}: {msg}", sub.id);
                        stats.invalid += 1;
                    }
                    Err(e) => {
                        error!(
                            "Abandoning renewal of {} until next tick: {e}",
                            sub.resource_id
                        );
                        stats.abandoned += 1;
                    }
                }
            }
        }

        stats
    }
}

/// Start the renewal daemon loop.
pub async fn renewal_daemon(monitor: Arc<Monitor>) {
    let interval = tokio::time::Duration::from_secs(TICK_INTERVAL_SECS);
    info!("Webhook renewal daemon started (interval: 5m)");

    loop {
        tokio::time::sleep(interval).await;
        if let Some(stats) = monitor.run_once().await {
            if stats != TickStats::default() {
                info!(
                    "Renewal tick complete: {} renewed, {} abandoned, {} invalid",
                    stats.renewed, stats.abandoned, stats.invalid
                );
            }
        }
    }
}
