use std::str::FromStr;

use crate::types::{BidRecord, Listing};

/// How "outbid" is decided for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutbidPolicy {
    /// Alert whenever the lowest bid belongs to someone else, including when
    /// the operator has not bid at all.
    Ownership,
    /// Alert only when the operator has a bid and the lowest bid is strictly
    /// below it.
    Undercut,
}

impl FromStr for OutbidPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ownership" => Ok(OutbidPolicy::Ownership),
            "undercut" => Ok(OutbidPolicy::Undercut),
            other => Err(format!(
                "OUTBID_POLICY '{other}' is not one of: ownership, undercut"
            )),
        }
    }
}

impl std::fmt::Display for OutbidPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutbidPolicy::Ownership => write!(f, "ownership"),
            OutbidPolicy::Undercut => write!(f, "undercut"),
        }
    }
}

/// A positive outbid decision for one listing.
#[derive(Debug, Clone, PartialEq)]
pub struct OutbidVerdict {
    pub lowest: BidRecord,
    pub own: Option<BidRecord>,
}

/// Minimum bid by amount; ties go to the earliest entry.
pub fn lowest_bid(bids: &[BidRecord]) -> Option<&BidRecord> {
    bids.iter().fold(None, |best: Option<&BidRecord>, bid| match best {
        Some(b) if b.amount <= bid.amount => Some(b),
        _ => Some(bid),
    })
}

/// The operator's bid, if present. First match wins.
pub fn own_bid<'a>(bids: &'a [BidRecord], own_driver_id: &str) -> Option<&'a BidRecord> {
    bids.iter()
        .find(|b| b.driver_id.as_deref() == Some(own_driver_id))
}

/// Apply `policy` to a listing. Listings without bids never alert.
pub fn evaluate(listing: &Listing, own_driver_id: &str, policy: OutbidPolicy) -> Option<OutbidVerdict> {
    let lowest = lowest_bid(&listing.bids)?;
    let own = own_bid(&listing.bids, own_driver_id);

    let outbid = match policy {
        OutbidPolicy::Ownership => lowest.driver_id.as_deref() != Some(own_driver_id),
        OutbidPolicy::Undercut => own.is_some_and(|o| lowest.amount < o.amount),
    };

    outbid.then(|| OutbidVerdict {
        lowest: lowest.clone(),
        own: own.cloned(),
    })
}
