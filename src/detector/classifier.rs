use crate::types::{BidState, Listing};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// First time this listing id has been seen.
    New,
    /// `(current_bid, my_bid)` differs from the stored snapshot.
    Updated { previous: BidState },
    Unchanged,
}

/// Classify a polled listing against the snapshot recorded for its id.
/// Pure: the caller owns the state write that must follow New/Updated.
pub fn classify(listing: &Listing, observed: Option<&BidState>) -> Classification {
    match observed {
        None => Classification::New,
        Some(previous) if *previous == listing.bid_state() => Classification::Unchanged,
        Some(previous) => Classification::Updated { previous: *previous },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(current_bid: Option<f64>, my_bid: Option<f64>) -> Listing {
        Listing {
            id: "A1".to_string(),
            current_bid,
            my_bid,
            ..Listing::default()
        }
    }

    fn state(current_bid: Option<f64>, my_bid: Option<f64>) -> BidState {
        BidState { current_bid, my_bid }
    }

    #[test]
    fn absent_is_new() {
        assert_eq!(classify(&listing(Some(300.0), None), None), Classification::New);
    }

    #[test]
    fn same_pair_is_unchanged() {
        let prev = state(Some(300.0), Some(280.0));
        assert_eq!(
            classify(&listing(Some(300.0), Some(280.0)), Some(&prev)),
            Classification::Unchanged
        );
    }

    #[test]
    fn both_absent_is_unchanged() {
        let prev = state(None, None);
        assert_eq!(classify(&listing(None, None), Some(&prev)), Classification::Unchanged);
    }

    #[test]
    fn current_bid_change_is_updated() {
        let prev = state(Some(300.0), None);
        assert_eq!(
            classify(&listing(Some(250.0), None), Some(&prev)),
            Classification::Updated { previous: prev }
        );
    }

    #[test]
    fn my_bid_change_is_updated() {
        let prev = state(Some(300.0), None);
        assert_eq!(
            classify(&listing(Some(300.0), Some(290.0)), Some(&prev)),
            Classification::Updated { previous: prev }
        );
    }

    #[test]
    fn bid_disappearing_is_updated() {
        let prev = state(Some(300.0), Some(290.0));
        assert!(matches!(
            classify(&listing(Some(300.0), None), Some(&prev)),
            Classification::Updated { .. }
        ));
    }

    #[test]
    fn classification_is_idempotent_without_state_write() {
        let prev = state(Some(300.0), None);
        let l = listing(Some(250.0), None);
        assert_eq!(classify(&l, Some(&prev)), classify(&l, Some(&prev)));
        assert_eq!(classify(&l, None), classify(&l, None));
    }
}
