//! Shared health state for the /health and /stats endpoints.
//! Each watcher owns one `WatcherHealth` and updates it after every poll.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::api::latency::LatencyStats;
use crate::types::PollReport;

/// Counters for a single watcher. Updated by the watcher, read by the API.
#[derive(Default)]
pub struct WatcherHealth {
    running: AtomicBool,
    polls_completed: AtomicU64,
    fetch_failures: AtomicU64,
    unrecognized_payloads: AtomicU64,
    records_dropped: AtomicU64,
    notifications_sent: AtomicU64,
    delivery_failures: AtomicU64,
    evicted: AtomicU64,
    tracked_listings: AtomicU64,
    /// Nanosecond timestamp of the last finished poll (0 = none).
    last_poll_at_ns: AtomicU64,
    pub fetch_latency: LatencyStats,
}

impl WatcherHealth {
    pub fn set_running(&self, v: bool) {
        self.running.store(v, Ordering::Relaxed);
    }

    /// Fold one poll's outcome into the counters.
    pub fn record_poll(&self, report: &PollReport, tracked: usize, at_ns: u64) {
        self.polls_completed.fetch_add(1, Ordering::Relaxed);
        if report.fetch_failed {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
        if report.unrecognized_shape {
            self.unrecognized_payloads.fetch_add(1, Ordering::Relaxed);
        }
        self.records_dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.notifications_sent.fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.delivery_failures.fetch_add(report.delivery_failures as u64, Ordering::Relaxed);
        self.evicted.fetch_add(report.evicted as u64, Ordering::Relaxed);
        self.tracked_listings.store(tracked as u64, Ordering::Relaxed);
        self.last_poll_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self, name: &str) -> WatcherSnapshot {
        let (p50, p95, p99) = self.fetch_latency.percentiles();
        WatcherSnapshot {
            name: name.to_string(),
            running: self.running.load(Ordering::Relaxed),
            polls_completed: self.polls_completed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            unrecognized_payloads: self.unrecognized_payloads.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            tracked_listings: self.tracked_listings.load(Ordering::Relaxed),
            last_poll_at_ns: self.last_poll_at_ns.load(Ordering::Relaxed),
            fetch_samples: self.fetch_latency.len(),
            fetch_p50_us: p50,
            fetch_p95_us: p95,
            fetch_p99_us: p99,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WatcherSnapshot {
    pub name: String,
    pub running: bool,
    pub polls_completed: u64,
    pub fetch_failures: u64,
    pub unrecognized_payloads: u64,
    pub records_dropped: u64,
    pub notifications_sent: u64,
    pub delivery_failures: u64,
    pub evicted: u64,
    pub tracked_listings: u64,
    pub last_poll_at_ns: u64,
    pub fetch_samples: u64,
    pub fetch_p50_us: Option<u64>,
    pub fetch_p95_us: Option<u64>,
    pub fetch_p99_us: Option<u64>,
}

/// Name → health for every watcher started by this process.
#[derive(Default)]
pub struct HealthRegistry {
    watchers: DashMap<String, Arc<WatcherHealth>>,
}

impl HealthRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, name: &str) -> Arc<WatcherHealth> {
        self.watchers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(WatcherHealth::default()))
            .clone()
    }

    /// Snapshots sorted by watcher name.
    pub fn snapshots(&self) -> Vec<WatcherSnapshot> {
        let mut out: Vec<_> = self
            .watchers
            .iter()
            .map(|e| e.value().snapshot(e.key()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let registry = HealthRegistry::new();
        let a = registry.register("feed");
        let b = registry.register("feed");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.snapshots().len(), 1);
    }

    #[test]
    fn record_poll_accumulates() {
        let registry = HealthRegistry::new();
        let h = registry.register("feed");
        h.set_running(true);
        h.record_poll(
            &PollReport { fetched: 3, new: 2, delivered: 1, delivery_failures: 1, dropped: 1, ..Default::default() },
            2,
            10,
        );
        h.record_poll(&PollReport { fetch_failed: true, ..Default::default() }, 2, 20);

        let snap = &registry.snapshots()[0];
        assert!(snap.running);
        assert_eq!(snap.polls_completed, 2);
        assert_eq!(snap.fetch_failures, 1);
        assert_eq!(snap.notifications_sent, 1);
        assert_eq!(snap.delivery_failures, 1);
        assert_eq!(snap.records_dropped, 1);
        assert_eq!(snap.tracked_listings, 2);
        assert_eq!(snap.last_poll_at_ns, 20);
    }
}
