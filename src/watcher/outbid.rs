use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::health::WatcherHealth;
use crate::config::ACTIVE_BIDS_LISTING_KEYS;
use crate::detector::{evaluate, OutbidPolicy};
use crate::fetcher::ListingSource;
use crate::notifier::Notifier;
use crate::state::ObservedStore;
use crate::types::{BidRecord, Notification, PollReport};
use crate::watcher::{deliver, fetch_batch, Watcher};

const NAME: &str = "outbid";

/// The lowest bid last alerted for a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertedBid {
    pub driver_id: Option<String>,
    pub amount: f64,
}

impl From<&BidRecord> for AlertedBid {
    fn from(bid: &BidRecord) -> Self {
        Self {
            driver_id: bid.driver_id.clone(),
            amount: bid.amount,
        }
    }
}

/// Watches the operator's active listings and alerts when they are outbid.
pub struct OutbidWatcher {
    source: Arc<dyn ListingSource>,
    notifier: Arc<dyn Notifier>,
    driver_id: String,
    policy: OutbidPolicy,
    /// listing_id → lowest bid already alerted while the listing stays outbid
    alerted: ObservedStore<AlertedBid>,
    health: Arc<WatcherHealth>,
}

impl OutbidWatcher {
    pub fn new(
        source: Arc<dyn ListingSource>,
        notifier: Arc<dyn Notifier>,
        driver_id: String,
        policy: OutbidPolicy,
        state_ttl_polls: u64,
        health: Arc<WatcherHealth>,
    ) -> Self {
        Self {
            source,
            notifier,
            driver_id,
            policy,
            alerted: ObservedStore::new(state_ttl_polls),
            health,
        }
    }
}

#[async_trait]
impl Watcher for OutbidWatcher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> Arc<WatcherHealth> {
        Arc::clone(&self.health)
    }

    fn tracked(&self) -> usize {
        self.alerted.len()
    }

    async fn poll_once(&mut self) -> PollReport {
        let mut report = PollReport::default();
        let Some(batch) = fetch_batch(
            NAME,
            self.source.as_ref(),
            ACTIVE_BIDS_LISTING_KEYS,
            &self.health,
            &mut report,
        )
        .await
        else {
            return report;
        };

        self.alerted.begin_poll();

        for listing in batch.listings {
            if listing.bids.is_empty() {
                debug!(watcher = NAME, listing_id = %listing.id, "No bids yet, skipping");
                continue;
            }

            let Some(verdict) = evaluate(&listing, &self.driver_id, self.policy) else {
                // Holding the lowest bid again; a later overtake alerts anew.
                self.alerted.remove(&listing.id);
                continue;
            };

            let lowest = AlertedBid::from(&verdict.lowest);
            if self.alerted.snapshot(&listing.id) == Some(&lowest) {
                self.alerted.touch(&listing.id);
                report.unchanged += 1;
                continue;
            }

            info!(
                watcher = NAME,
                listing_id = %listing.id,
                policy = %self.policy,
                lowest_amount = verdict.lowest.amount,
                lowest_driver = ?verdict.lowest.driver_id,
                own_amount = ?verdict.own.as_ref().map(|b| b.amount),
                "Outbid on shipment {}",
                listing.id,
            );
            report.alerts += 1;
            self.alerted.record(&listing.id, lowest);

            let notification = Notification::Outbid {
                listing,
                lowest: verdict.lowest,
                own: verdict.own,
            };
            deliver(NAME, self.notifier.as_ref(), &notification, &mut report).await;
        }

        report.evicted = self.alerted.evict_stale();
        report
    }
}
