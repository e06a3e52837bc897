//! Background loop keeping credentials fresh and published events reconciled.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rsvp_core::channel::{CredentialRefresher, DeliveryChannel};
use rsvp_core::refresh;
use rsvp_core::scheduler::{Scheduler, TickReport};
use rsvp_core::state::StateStore;
use tracing::{debug, error};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct Worker {
    store: StateStore,
    scheduler: Scheduler,
    channel: Arc<dyn DeliveryChannel>,
    refresher: Arc<dyn CredentialRefresher>,
}

impl Worker {
    pub fn new(
        store: StateStore,
        scheduler: Scheduler,
        channel: Arc<dyn DeliveryChannel>,
        refresher: Arc<dyn CredentialRefresher>,
    ) -> Self {
        Worker {
            store,
            scheduler,
            channel,
            refresher,
        }
    }

    /// Run `tick` once per second until the process exits.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.tick(Utc::now()).await;
            }
        })
    }

    /// Refresh credentials if due, then reconcile events.
    ///
    /// Nothing is published before the webhook has been authorized. Returns the
    /// reconciliation report, or None if reconciliation did not run.
    pub async fn tick(&self, now: DateTime<Utc>) -> Option<TickReport> {
        if let Err(e) = refresh::refresh_if_due(&self.store, self.refresher.as_ref(), now).await {
            error!(error = %e, "Could not store refreshed credentials");
        }

        let state = self.store.snapshot().await;
        if !state.credentials.has_access_token() || !state.webhook.is_set() {
            debug!("Waiting for webhook authorization");
            return None;
        }

        let report = self
            .scheduler
            .reconcile(&self.store, self.channel.as_ref(), now)
            .await;
        Some(report)
    }
}
