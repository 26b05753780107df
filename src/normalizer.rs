//! Turns loosely-shaped listing payloads into `Listing` values.
//!
//! Nothing in here fails: unusable records are dropped and counted, missing
//! nested objects become empty structures.

use serde_json::Value;

use crate::types::{BidRecord, Listing, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The listing array was found under this wrapper key.
    Key(&'static str),
    /// None of the expected wrapper keys held an array.
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub listings: Vec<Listing>,
    /// Records discarded for lacking an id (or not being objects).
    pub dropped: usize,
    pub shape: PayloadShape,
}

/// Normalize a response document, trying `keys` in priority order for the
/// listing array.
pub fn normalize(document: &Value, keys: &[&'static str]) -> NormalizedBatch {
    let found = keys
        .iter()
        .find_map(|&key| document.get(key).and_then(|v| v.as_array()).map(|a| (key, a)));

    let Some((key, records)) = found else {
        return NormalizedBatch {
            listings: Vec::new(),
            dropped: 0,
            shape: PayloadShape::Unrecognized,
        };
    };

    let mut listings = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for record in records {
        match parse_listing(record) {
            Some(listing) => listings.push(listing),
            None => dropped += 1,
        }
    }

    NormalizedBatch {
        listings,
        dropped,
        shape: PayloadShape::Key(key),
    }
}

/// Parse one raw record. Returns None only when no usable id is present.
pub fn parse_listing(v: &Value) -> Option<Listing> {
    if !v.is_object() {
        return None;
    }
    let id = id_string(v.get("id")?)?;

    Some(Listing {
        id,
        title: str_field(v, "title"),
        slug: str_field(v, "slug"),
        origin: parse_location(v.get("pickup")),
        destination: parse_location(v.get("delivery")),
        current_bid: v
            .get("budget")
            .and_then(number)
            .or_else(|| v.get("currentBid").and_then(number)),
        my_bid: v.get("myBid").and_then(number),
        bids: parse_bids(v.get("bids")),
    })
}

fn parse_location(v: Option<&Value>) -> Location {
    let Some(v) = v else {
        return Location::default();
    };
    Location {
        city: str_field(v, "city"),
        state_code: str_field(v, "stateCode"),
    }
}

/// Bids arrive either as a bare array or wrapped as `{ "data": [...] }`.
fn parse_bids(v: Option<&Value>) -> Vec<BidRecord> {
    let entries = match v {
        Some(Value::Array(a)) => a,
        Some(obj @ Value::Object(_)) => match obj.get("data").and_then(|d| d.as_array()) {
            Some(a) => a,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|bid| {
            let amount = bid.get("amount").and_then(number)?;
            let driver = bid.get("driver");
            let driver_id = driver
                .and_then(|d| d.get("id"))
                .or_else(|| bid.get("driverId"))
                .and_then(id_string);
            let driver_display_name = driver
                .and_then(|d| str_field(d, "displayName"))
                .or_else(|| str_field(bid, "driverDisplayName"));
            Some(BidRecord { driver_id, amount, driver_display_name })
        })
        .collect()
}

/// Ids may be strings or numbers; empty strings do not count.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n: &f64| n.is_finite())
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
