use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::health::WatcherHealth;
use crate::config::FEED_LISTING_KEYS;
use crate::detector::{classify, Classification};
use crate::fetcher::ListingSource;
use crate::notifier::Notifier;
use crate::state::ObservedStore;
use crate::types::{BidState, Notification, PollReport};
use crate::watcher::{deliver, fetch_batch, Watcher};

const NAME: &str = "feed";

/// Watches the recommended-listings feed for new listings and bid changes.
pub struct FeedWatcher {
    source: Arc<dyn ListingSource>,
    notifier: Arc<dyn Notifier>,
    /// listing_id → `(current_bid, my_bid)` at the last notification
    observed: ObservedStore<BidState>,
    health: Arc<WatcherHealth>,
}

impl FeedWatcher {
    pub fn new(
        source: Arc<dyn ListingSource>,
        notifier: Arc<dyn Notifier>,
        state_ttl_polls: u64,
        health: Arc<WatcherHealth>,
    ) -> Self {
        Self {
            source,
            notifier,
            observed: ObservedStore::new(state_ttl_polls),
            health,
        }
    }

    #[cfg(test)]
    pub fn observed(&self) -> &ObservedStore<BidState> {
        &self.observed
    }
}

#[async_trait]
impl Watcher for FeedWatcher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> Arc<WatcherHealth> {
        Arc::clone(&self.health)
    }

    fn tracked(&self) -> usize {
        self.observed.len()
    }

    async fn poll_once(&mut self) -> PollReport {
        let mut report = PollReport::default();
        let Some(batch) =
            fetch_batch(NAME, self.source.as_ref(), FEED_LISTING_KEYS, &self.health, &mut report).await
        else {
            return report;
        };

        self.observed.begin_poll();

        for listing in batch.listings {
            let notification = match classify(&listing, self.observed.snapshot(&listing.id)) {
                Classification::Unchanged => {
                    self.observed.touch(&listing.id);
                    report.unchanged += 1;
                    debug!(watcher = NAME, listing_id = %listing.id, "Already seen, unchanged");
                    continue;
                }
                Classification::New => {
                    report.new += 1;
                    info!(watcher = NAME, listing_id = %listing.id, "New shipment {}", listing.id);
                    Notification::ListingNew { listing }
                }
                Classification::Updated { previous } => {
                    report.updated += 1;
                    info!(
                        watcher = NAME,
                        listing_id = %listing.id,
                        old_bid = ?previous.current_bid,
                        new_bid = ?listing.current_bid,
                        old_my_bid = ?previous.my_bid,
                        new_my_bid = ?listing.my_bid,
                        "Shipment {} bid state changed",
                        listing.id,
                    );
                    Notification::ListingUpdated { listing, previous }
                }
            };

            // Record before delivering: a failed send is not retried next poll.
            let listing = notification.listing();
            self.observed.record(&listing.id, listing.bid_state());
            deliver(NAME, self.notifier.as_ref(), &notification, &mut report).await;
        }

        report.evicted = self.observed.evict_stale();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::api::health::HealthRegistry;
    use crate::error::FetchError;
    use crate::types::EventKind;
    use crate::watcher::testkit::{RecordingNotifier, ScriptedSource};

    fn watcher(
        responses: Vec<Result<serde_json::Value, FetchError>>,
        ttl: u64,
    ) -> (FeedWatcher, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let w = FeedWatcher::new(
            Arc::new(ScriptedSource::new(responses)),
            notifier.clone(),
            ttl,
            HealthRegistry::new().register(NAME),
        );
        (w, notifier)
    }

    fn austin_dallas(budget: u32) -> serde_json::Value {
        json!({"data": [{
            "id": "A1",
            "pickup": {"city": "Austin", "stateCode": "TX"},
            "delivery": {"city": "Dallas", "stateCode": "TX"},
            "budget": budget,
        }]})
    }

    #[tokio::test]
    async fn new_then_updated_then_silent() {
        let (mut w, notifier) = watcher(
            vec![Ok(austin_dallas(300)), Ok(austin_dallas(250)), Ok(austin_dallas(250))],
            0,
        );

        let r1 = w.poll_once().await;
        assert_eq!((r1.new, r1.updated, r1.delivered), (1, 0, 1));
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), EventKind::New);
        let listing = sent[0].listing();
        assert_eq!(listing.id, "A1");
        assert_eq!(listing.origin.to_string(), "Austin, TX");
        assert_eq!(listing.destination.to_string(), "Dallas, TX");
        assert_eq!(listing.current_bid, Some(300.0));

        let r2 = w.poll_once().await;
        assert_eq!((r2.new, r2.updated), (0, 1));
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        match &sent[1] {
            Notification::ListingUpdated { listing, previous } => {
                assert_eq!(listing.current_bid, Some(250.0));
                assert_eq!(previous.current_bid, Some(300.0));
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(
            w.observed().snapshot("A1").unwrap().current_bid,
            Some(250.0)
        );

        let r3 = w.poll_once().await;
        assert_eq!((r3.new, r3.updated, r3.unchanged), (0, 0, 1));
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn my_bid_change_fires_update() {
        let doc = |my_bid: Option<u32>| {
            json!({"shipments": [{"id": "X", "budget": 100, "myBid": my_bid}]})
        };
        let (mut w, notifier) = watcher(vec![Ok(doc(None)), Ok(doc(Some(90)))], 0);
        w.poll_once().await;
        let r = w.poll_once().await;
        assert_eq!(r.updated, 1);
        assert_eq!(notifier.sent()[1].listing().my_bid, Some(90.0));
    }

    #[tokio::test]
    async fn malformed_record_does_not_block_batch() {
        let doc = json!({"data": [
            {"id": "1"},
            {"title": "missing id"},
            {"id": "2", "pickup": null, "bids": "garbage"},
            {"id": "3", "budget": "abc"},
        ]});
        let (mut w, notifier) = watcher(vec![Ok(doc)], 0);
        let r = w.poll_once().await;
        assert_eq!(r.fetched, 3);
        assert_eq!(r.dropped, 1);
        assert_eq!(r.new + r.updated + r.unchanged, 3);
        assert_eq!(notifier.sent().len(), 3);
    }

    #[tokio::test]
    async fn fetch_failure_is_empty_poll_and_keeps_state() {
        let (mut w, notifier) = watcher(
            vec![
                Ok(austin_dallas(300)),
                Err(FetchError::Status { status: 502 }),
                Ok(austin_dallas(300)),
            ],
            1,
        );
        w.poll_once().await;

        let r = w.poll_once().await;
        assert!(r.fetch_failed);
        assert_eq!(r.evicted, 0);
        assert_eq!(w.tracked(), 1);

        // Failed poll did not advance the eviction clock, so no re-announcement.
        let r = w.poll_once().await;
        assert_eq!(r.unchanged, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn unrecognized_payload_is_non_fatal() {
        let (mut w, notifier) = watcher(
            vec![Ok(json!({"listings": [{"id": "A"}]})), Ok(austin_dallas(300))],
            0,
        );
        let r = w.poll_once().await;
        assert!(r.unrecognized_shape);
        assert_eq!(r.fetched, 0);

        let r = w.poll_once().await;
        assert_eq!(r.new, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_is_not_retried() {
        let (mut w, notifier) = watcher(vec![Ok(austin_dallas(300)), Ok(austin_dallas(300))], 0);
        notifier.set_failing(true);

        let r = w.poll_once().await;
        assert_eq!((r.new, r.delivered, r.delivery_failures), (1, 0, 1));
        assert!(w.observed().snapshot("A1").is_some());

        notifier.set_failing(false);
        let r = w.poll_once().await;
        assert_eq!(r.unchanged, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_batch_notify_once() {
        let doc = json!({"data": [{"id": "D", "budget": 5}, {"id": "D", "budget": 5}]});
        let (mut w, notifier) = watcher(vec![Ok(doc)], 0);
        let r = w.poll_once().await;
        assert_eq!((r.new, r.unchanged), (1, 1));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn evicted_listing_is_new_again() {
        let (mut w, notifier) = watcher(
            vec![
                Ok(json!({"data": [{"id": "old"}]})),
                Ok(json!({"data": []})),
                Ok(json!({"data": []})),
                Ok(json!({"data": [{"id": "old"}]})),
            ],
            2,
        );
        w.poll_once().await;
        w.poll_once().await;
        let r = w.poll_once().await;
        assert_eq!(r.evicted, 1);
        assert_eq!(w.tracked(), 0);

        let r = w.poll_once().await;
        assert_eq!(r.new, 1);
        assert_eq!(notifier.sent().len(), 2);
    }
}
