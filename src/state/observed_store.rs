use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct ObservedEntry<S> {
    /// Snapshot captured at the last event-producing poll.
    snapshot: S,
    /// Poll number at which the listing was last present in a successful fetch.
    last_seen_poll: u64,
}

// ---------------------------------------------------------------------------
// ObservedStore
// ---------------------------------------------------------------------------

/// Per-listing memory owned by a single watcher loop.
///
/// The poll clock only advances on successful fetches, so a run of failed
/// polls never causes listings to be evicted and re-announced.
#[derive(Debug)]
pub struct ObservedStore<S> {
    /// listing_id → last recorded snapshot
    entries: HashMap<String, ObservedEntry<S>>,
    poll: u64,
    /// Entries unseen for this many polls are evicted; 0 keeps them forever.
    ttl_polls: u64,
}

impl<S> ObservedStore<S> {
    pub fn new(ttl_polls: u64) -> Self {
        Self {
            entries: HashMap::new(),
            poll: 0,
            ttl_polls,
        }
    }

    /// Advance the poll clock. Call once per successful fetch, before any
    /// `record`/`touch` for that poll.
    pub fn begin_poll(&mut self) -> u64 {
        self.poll += 1;
        self.poll
    }

    pub fn snapshot(&self, listing_id: &str) -> Option<&S> {
        self.entries.get(listing_id).map(|e| &e.snapshot)
    }

    /// Store a new snapshot for a listing, creating the entry on first sight.
    pub fn record(&mut self, listing_id: &str, snapshot: S) {
        let last_seen_poll = self.poll;
        self.entries.insert(
            listing_id.to_string(),
            ObservedEntry { snapshot, last_seen_poll },
        );
    }

    /// Mark a listing as present in the current poll without changing its snapshot.
    pub fn touch(&mut self, listing_id: &str) {
        if let Some(entry) = self.entries.get_mut(listing_id) {
            entry.last_seen_poll = self.poll;
        }
    }

    pub fn remove(&mut self, listing_id: &str) -> Option<S> {
        self.entries.remove(listing_id).map(|e| e.snapshot)
    }

    /// Drop entries not seen within the TTL. Returns how many were removed.
    pub fn evict_stale(&mut self) -> usize {
        if self.ttl_polls == 0 || self.is_empty() {
            return 0;
        }
        let horizon = self.poll.saturating_sub(self.ttl_polls);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.last_seen_poll > horizon);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
