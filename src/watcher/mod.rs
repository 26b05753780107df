pub mod feed;
pub mod outbid;

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::health::WatcherHealth;
use crate::fetcher::ListingSource;
use crate::normalizer::{normalize, NormalizedBatch, PayloadShape};
use crate::notifier::Notifier;
use crate::types::{Notification, PollReport};

pub use feed::FeedWatcher;
pub use outbid::OutbidWatcher;

#[async_trait]
pub trait Watcher: Send {
    fn name(&self) -> &'static str;

    fn health(&self) -> Arc<WatcherHealth>;

    /// Listings currently held in the watcher's state map.
    fn tracked(&self) -> usize;

    /// One full iteration: fetch, normalize, classify, notify.
    async fn poll_once(&mut self) -> PollReport;
}

/// Drive a watcher until `shutdown` flips to true (or its sender is dropped).
///
/// The first poll runs immediately. Ticks are delayed rather than bursted, so
/// polls never overlap, and shutdown is only observed between polls.
pub async fn run<W: Watcher>(mut watcher: W, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let name = watcher.name();
    let health = watcher.health();
    health.set_running(true);
    info!(watcher = name, interval_secs = every.as_secs_f64(), "Watcher started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {
                let report = watcher.poll_once().await;
                log_report(name, &report);
                health.record_poll(&report, watcher.tracked(), now_ns());
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    health.set_running(false);
    info!(watcher = name, "Watcher stopped");
}

fn log_report(name: &str, r: &PollReport) {
    if r.fetch_failed {
        return;
    }
    info!(
        watcher = name,
        fetched = r.fetched,
        dropped = r.dropped,
        new = r.new,
        updated = r.updated,
        unchanged = r.unchanged,
        alerts = r.alerts,
        delivered = r.delivered,
        delivery_failures = r.delivery_failures,
        evicted = r.evicted,
        "Poll complete: {} listings, {} notifications ({} failed)",
        r.fetched,
        r.notifications(),
        r.delivery_failures,
    );
}

/// Fetch and normalize one document. Returns None when the poll must be
/// treated as having zero listings; `report` records why.
pub(crate) async fn fetch_batch(
    name: &'static str,
    source: &dyn ListingSource,
    keys: &[&'static str],
    health: &WatcherHealth,
    report: &mut PollReport,
) -> Option<NormalizedBatch> {
    let started = Instant::now();
    let result = source.fetch().await;
    health.fetch_latency.record(started.elapsed());

    let document = match result {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                watcher = name,
                endpoint = source.endpoint(),
                status = e.status_code(),
                transport = e.is_transport(),
                "Fetch failed, skipping poll: {e}"
            );
            report.fetch_failed = true;
            return None;
        }
    };

    let batch = normalize(&document, keys);
    if batch.shape == PayloadShape::Unrecognized {
        let top_level: Vec<&str> = document
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        warn!(
            watcher = name,
            expected = ?keys,
            found = ?top_level,
            "No recognizable listing key in response"
        );
        report.unrecognized_shape = true;
        return None;
    }

    if let PayloadShape::Key(key) = batch.shape {
        debug!(watcher = name, key, records = batch.listings.len() + batch.dropped, "Listing array found");
    }
    if batch.dropped > 0 {
        debug!(watcher = name, dropped = batch.dropped, "Dropped records without an id");
    }
    report.fetched = batch.listings.len();
    report.dropped = batch.dropped;
    Some(batch)
}

/// Deliver one notification, folding the outcome into `report`. Never retries.
pub(crate) async fn deliver(
    name: &'static str,
    notifier: &dyn Notifier,
    notification: &Notification,
    report: &mut PollReport,
) {
    let listing_id = &notification.listing().id;
    match notifier.notify(notification).await {
        Ok(()) => {
            report.delivered += 1;
            info!(
                watcher = name,
                listing_id = %listing_id,
                kind = %notification.kind(),
                "Notification sent"
            );
        }
        Err(e) => {
            report.delivery_failures += 1;
            warn!(
                watcher = name,
                listing_id = %listing_id,
                kind = %notification.kind(),
                "Notification delivery failed: {e}"
            );
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// ---------------------------------------------------------------------------
// Test doubles shared by the watcher tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testkit {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::error::{DeliveryError, DeliveryResult, FetchError};
    use crate::fetcher::ListingSource;
    use crate::notifier::Notifier;
    use crate::types::Notification;

    /// Serves queued responses in order; an empty queue yields `{"data": []}`.
    #[derive(Default)]
    pub struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Value, FetchError>>>,
        pub delay: Duration,
    }

    impl ScriptedSource {
        pub fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ListingSource for ScriptedSource {
        async fn fetch(&self) -> Result<Value, FetchError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(serde_json::json!({"data": []})))
        }

        fn endpoint(&self) -> &str {
            "scripted"
        }
    }

    /// Records every notification; fails delivery while `fail` is set.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> DeliveryResult {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(DeliveryError::Status { status: 500, body: "boom".into() });
            }
            Ok(())
        }
    }
}
