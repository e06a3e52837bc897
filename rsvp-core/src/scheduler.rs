//! Reconciliation of configured events against published ones.
//!
//! Each tick recomputes the desired occurrences from scratch, publishes the
//! ones missing from the state store and cleans up the ones that are over.
//! Nothing is retried within a tick: anything that failed is still missing
//! on the next one.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, error, info, warn};

use crate::channel::DeliveryChannel;
use crate::event::EventDefinition;
use crate::publisher;
use crate::recurrence;
use crate::state::{StateStore, WebhookDestination};

/// How long after its start an occurrence stays up.
pub const GRACE_HOURS: i64 = 2;

/// An occurrence that should exist but has not been published yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOccurrence<'a> {
    pub definition: &'a EventDefinition,
    pub starts_at: DateTime<FixedOffset>,
}

/// What one tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub published: usize,
    pub failed: usize,
    pub expired: usize,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.published == 0 && self.failed == 0 && self.expired == 0
    }
}

pub struct Scheduler {
    definitions: Vec<EventDefinition>,
    activities: BTreeMap<String, String>,
    look_ahead: Duration,
    grace: Duration,
}

impl Scheduler {
    pub fn new(definitions: Vec<EventDefinition>, activities: BTreeMap<String, String>) -> Self {
        Scheduler {
            definitions,
            activities,
            look_ahead: recurrence::default_look_ahead(),
            grace: Duration::hours(GRACE_HOURS),
        }
    }

    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    /// Occurrences inside the look-ahead window without a matching record in `published`.
    ///
    /// Matching is by title and exact instant.
    pub fn pending<'a>(
        &'a self,
        published: &HashSet<(String, DateTime<Utc>)>,
        now: DateTime<Utc>,
    ) -> Vec<PendingOccurrence<'a>> {
        self.definitions
            .iter()
            .flat_map(|definition| {
                recurrence::expand(definition, now, self.look_ahead)
                    .into_iter()
                    .map(move |starts_at| PendingOccurrence {
                        definition,
                        starts_at,
                    })
            })
            .filter(|occ| {
                !published.contains(&(
                    occ.definition.title.clone(),
                    occ.starts_at.with_timezone(&Utc),
                ))
            })
            .collect()
    }

    /// Run one reconciliation pass.
    ///
    /// Failures are logged and counted per occurrence; one failing occurrence
    /// never stops the others from being handled.
    pub async fn reconcile(
        &self,
        store: &StateStore,
        channel: &dyn DeliveryChannel,
        now: DateTime<Utc>,
    ) -> TickReport {
        let mut report = TickReport::default();

        let state = store.snapshot().await;
        let published: HashSet<(String, DateTime<Utc>)> = state
            .events
            .iter()
            .map(|e| (e.title.clone(), e.starts_at))
            .collect();

        let pending = self.pending(&published, now);
        if !pending.is_empty() {
            if state.webhook.is_set() {
                self.publish_pending(&pending, &state.webhook, store, channel, &mut report)
                    .await;
            } else {
                warn!(
                    count = pending.len(),
                    "No webhook destination configured, skipping publication"
                );
            }
        }

        let cutoff = now - self.grace;
        for event in state.events.iter().filter(|e| e.starts_at < cutoff) {
            let destination = WebhookDestination {
                id: event.webhook_id.clone(),
                token: event.webhook_token.clone(),
            };

            if let Err(e) = channel.delete(&destination, &event.message_id).await {
                warn!(
                    title = %event.title,
                    starts_at = %event.starts_at,
                    error = %e,
                    "Could not delete message of expired event"
                );
            }

            if let Err(e) = store.remove_event(&event.title, event.starts_at).await {
                error!(
                    title = %event.title,
                    starts_at = %event.starts_at,
                    error = %e,
                    "Could not persist removal of expired event"
                );
                report.failed += 1;
                continue;
            }
            report.expired += 1;
            info!(title = %event.title, starts_at = %event.starts_at, "Removed expired event");
        }

        if !report.is_empty() {
            debug!(?report, "Reconciliation tick finished");
        }
        report
    }

    async fn publish_pending(
        &self,
        pending: &[PendingOccurrence<'_>],
        destination: &WebhookDestination,
        store: &StateStore,
        channel: &dyn DeliveryChannel,
        report: &mut TickReport,
    ) {
        for occ in pending {
            let result = publisher::publish(
                channel,
                destination,
                occ.definition,
                occ.starts_at,
                &self.activities,
            )
            .await;

            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    error!(
                        title = %occ.definition.title,
                        starts_at = %occ.starts_at,
                        error = %e,
                        "Could not publish event"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            // The record stays in memory, so only a restart before the next successful
            // save can publish this occurrence twice
            if let Err(e) = store.add_event(event).await {
                error!(
                    title = %occ.definition.title,
                    starts_at = %occ.starts_at,
                    error = %e,
                    "Could not persist published event"
                );
                report.failed += 1;
                continue;
            }
            report.published += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Repeat, RsvpEvent};
    use crate::testing::FakeChannel;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn definition(title: &str, first: &str, repeat: Repeat) -> EventDefinition {
        EventDefinition {
            title: title.to_string(),
            first_occurrence: DateTime::parse_from_rfc3339(first).unwrap(),
            repeat,
        }
    }

    fn activities() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Chess".to_string(), "Board game".to_string()),
            ("Go".to_string(), "Also a board game".to_string()),
        ])
    }

    async fn store_with_webhook(dir: &tempfile::TempDir) -> StateStore {
        let store = StateStore::load(dir.path().join("state.json"));
        store
            .set_webhook(WebhookDestination {
                id: "hook".to_string(),
                token: "secret".to_string(),
            })
            .await
            .unwrap();
        store
    }

    fn published_event(title: &str, starts_at: DateTime<Utc>, message_id: &str) -> RsvpEvent {
        RsvpEvent {
            title: title.to_string(),
            starts_at,
            message_id: message_id.to_string(),
            webhook_id: "old-hook".to_string(),
            webhook_token: "old-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_tick_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_webhook(&dir).await;
        let channel = FakeChannel::default();
        let scheduler = Scheduler::new(
            vec![
                definition("Game Night", "2024-06-01T19:00:00+02:00", Repeat::Daily),
                definition("Raid", "2024-06-12T20:00:00Z", Repeat::Never),
            ],
            activities(),
        );
        let now = utc("2024-06-10T12:00:00Z");

        let first = scheduler.reconcile(&store, &channel, now).await;
        assert_eq!(first.published, 6);
        assert_eq!(channel.sent_count(), 6);

        let second = scheduler.reconcile(&store, &channel, now).await;
        assert!(second.is_empty());
        assert_eq!(channel.sent_count(), 6);
        assert_eq!(store.events().await.len(), 6);
    }

    #[tokio::test]
    async fn test_published_records_use_current_webhook() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_webhook(&dir).await;
        let channel = FakeChannel::default();
        let scheduler = Scheduler::new(
            vec![definition("Raid", "2024-06-12T20:00:00Z", Repeat::Never)],
            activities(),
        );

        scheduler
            .reconcile(&store, &channel, utc("2024-06-10T12:00:00Z"))
            .await;

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].starts_at, utc("2024-06-12T20:00:00Z"));
        assert_eq!(events[0].webhook_id, "hook");
        assert_eq!(events[0].webhook_token, "secret");
        assert_eq!(events[0].message_id, "msg-1");
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_webhook(&dir).await;
        let channel = FakeChannel::failing_titles(&["Broken"]);
        let scheduler = Scheduler::new(
            vec![
                definition("Broken", "2024-06-11T19:00:00Z", Repeat::Never),
                definition("Working", "2024-06-12T19:00:00Z", Repeat::Never),
            ],
            activities(),
        );
        let now = utc("2024-06-10T12:00:00Z");

        let report = scheduler.reconcile(&store, &channel, now).await;

        assert_eq!(report.published, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(channel.sent_titles(), vec!["Working"]);
        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Working");
    }

    #[tokio::test]
    async fn test_expiry_respects_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_webhook(&dir).await;
        let channel = FakeChannel::default();
        let scheduler = Scheduler::new(Vec::new(), activities());
        let now = utc("2024-06-10T12:00:00Z");

        store
            .add_event(published_event("Old", now - Duration::hours(3), "old-msg"))
            .await
            .unwrap();
        store
            .add_event(published_event("Recent", now - Duration::hours(1), "recent-msg"))
            .await
            .unwrap();

        let report = scheduler.reconcile(&store, &channel, now).await;

        assert_eq!(report.expired, 1);
        assert_eq!(channel.deleted(), vec!["old-msg"]);
        let remaining: Vec<_> = store.events().await.into_iter().map(|e| e.title).collect();
        assert_eq!(remaining, vec!["Recent"]);
    }

    #[tokio::test]
    async fn test_expired_record_removed_even_if_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_webhook(&dir).await;
        let channel = FakeChannel::failing_deletes();
        let scheduler = Scheduler::new(Vec::new(), activities());
        let now = utc("2024-06-10T12:00:00Z");

        store
            .add_event(published_event("Old", now - Duration::hours(3), "old-msg"))
            .await
            .unwrap();

        let report = scheduler.reconcile(&store, &channel, now).await;

        assert_eq!(report.expired, 1);
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_webhook_skips_publication() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"));
        let channel = FakeChannel::default();
        let scheduler = Scheduler::new(
            vec![definition("Raid", "2024-06-12T20:00:00Z", Repeat::Never)],
            activities(),
        );

        let report = scheduler
            .reconcile(&store, &channel, utc("2024-06-10T12:00:00Z"))
            .await;

        assert!(report.is_empty());
        assert_eq!(channel.sent_count(), 0);
    }

    #[test]
    fn test_pending_matches_exact_instant_only() {
        let scheduler = Scheduler::new(
            vec![definition("Game Night", "2024-06-11T19:00:00+02:00", Repeat::Never)],
            BTreeMap::new(),
        );
        let now = utc("2024-06-10T12:00:00Z");

        // Same instant written in UTC counts as published
        let same = HashSet::from([("Game Night".to_string(), utc("2024-06-11T17:00:00Z"))]);
        assert!(scheduler.pending(&same, now).is_empty());

        // Same day, different time does not
        let other_time = HashSet::from([("Game Night".to_string(), utc("2024-06-11T18:00:00Z"))]);
        assert_eq!(scheduler.pending(&other_time, now).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_removal_does_not_stop_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::load(&path);
        let channel = FakeChannel::default();
        let scheduler = Scheduler::new(Vec::new(), activities());
        let now = utc("2024-06-10T12:00:00Z");

        store
            .add_event(published_event("First", now - Duration::hours(5), "first-msg"))
            .await
            .unwrap();
        store
            .add_event(published_event("Second", now - Duration::hours(4), "second-msg"))
            .await
            .unwrap();

        // A non-empty directory in place of the state file makes every save fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let report = scheduler.reconcile(&store, &channel, now).await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.expired, 0);
        assert_eq!(channel.deleted(), vec!["first-msg", "second-msg"]);
        assert!(store.events().await.is_empty());
    }
}
