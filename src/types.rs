/// Rendered in place of any missing location component.
pub const UNKNOWN: &str = "Unknown";

/// Rendered in place of a missing monetary amount.
pub const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub city: Option<String>,
    pub state_code: Option<String>,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}",
            self.city.as_deref().unwrap_or(UNKNOWN),
            self.state_code.as_deref().unwrap_or(UNKNOWN),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BidRecord {
    pub driver_id: Option<String>,
    pub amount: f64,
    pub driver_display_name: Option<String>,
}

/// One freight job as seen on either feed, after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub origin: Location,
    pub destination: Location,
    /// Budget or current lowest bid shown on the listing.
    pub current_bid: Option<f64>,
    pub my_bid: Option<f64>,
    pub bids: Vec<BidRecord>,
}

impl Listing {
    /// The pair whose changes drive UPDATED notifications.
    pub fn bid_state(&self) -> BidState {
        BidState {
            current_bid: self.current_bid,
            my_bid: self.my_bid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BidState {
    pub current_bid: Option<f64>,
    pub my_bid: Option<f64>,
}

/// Format a monetary amount the way listings display it: whole dollars stay
/// whole, anything else gets two decimals.
pub fn format_amount(amount: Option<f64>) -> String {
    match amount {
        Some(v) if v.fract() == 0.0 => format!("${v:.0}"),
        Some(v) => format!("${v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Notifications: produced by the watchers, consumed by the notifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    New,
    Updated,
    Outbid,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::New => "new",
            EventKind::Updated => "updated",
            EventKind::Outbid => "outbid",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ListingNew {
        listing: Listing,
    },
    ListingUpdated {
        listing: Listing,
        previous: BidState,
    },
    Outbid {
        listing: Listing,
        lowest: BidRecord,
        /// The operator's own bid on the listing, when one exists.
        own: Option<BidRecord>,
    },
}

impl Notification {
    pub fn kind(&self) -> EventKind {
        match self {
            Notification::ListingNew { .. } => EventKind::New,
            Notification::ListingUpdated { .. } => EventKind::Updated,
            Notification::Outbid { .. } => EventKind::Outbid,
        }
    }

    pub fn listing(&self) -> &Listing {
        match self {
            Notification::ListingNew { listing }
            | Notification::ListingUpdated { listing, .. }
            | Notification::Outbid { listing, .. } => listing,
        }
    }
}

// ---------------------------------------------------------------------------
// Poll reports
// ---------------------------------------------------------------------------

/// Outcome of a single watcher iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub fetch_failed: bool,
    pub unrecognized_shape: bool,
    pub fetched: usize,
    pub dropped: usize,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub alerts: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub evicted: usize,
}

impl PollReport {
    pub fn notifications(&self) -> usize {
        self.delivered + self.delivery_failures
    }
}
