use std::time::Duration;

use crate::detector::OutbidPolicy;
use crate::error::{AppError, Result};

pub const FEED_URL: &str = "https://daedalus.citizenshipper.com/api/shipments/?feed=recommended";
pub const ACTIVE_BIDS_URL: &str = "https://daedalus.citizenshipper.com/api/shipments/?feed=active";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const WEB_BASE_URL: &str = "https://citizenshipper.com";

/// Wrapper keys tried, in order, for the recommended-listings array.
pub const FEED_LISTING_KEYS: &[&str] = &["shipments", "results", "data"];

/// The active-bids endpoint always wraps its listings under `data`.
pub const ACTIVE_BIDS_LISTING_KEYS: &[&str] = &["data"];

/// Default eviction horizon: one day of 30s polls.
pub const DEFAULT_STATE_TTL_POLLS: u64 = 2880;

/// Which watchers WATCHERS names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WatcherSet {
    feed: bool,
    outbid: bool,
}

impl WatcherSet {
    fn parse(raw: &str) -> Result<Self> {
        let mut set = WatcherSet { feed: false, outbid: false };
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "feed" => set.feed = true,
                "outbid" => set.outbid = true,
                other => {
                    return Err(AppError::Config(format!(
                        "WATCHERS contains unknown watcher '{other}' (expected feed, outbid)"
                    )))
                }
            }
        }
        if !set.feed && !set.outbid {
            return Err(AppError::Config("WATCHERS must name at least one watcher".to_string()));
        }
        Ok(set)
    }
}

/// Settings that only exist when the outbid watcher runs.
#[derive(Debug, Clone)]
pub struct OutbidConfig {
    /// Own driver id (DRIVER_ID), compared against bid driver ids.
    pub driver_id: String,
    pub poll_interval: Duration,
    pub policy: OutbidPolicy,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_token: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub feed_enabled: bool,
    /// None when WATCHERS leaves out the outbid watcher.
    pub outbid: Option<OutbidConfig>,
    pub feed_url: String,
    pub active_bids_url: String,
    pub telegram_api_url: String,
    pub web_base_url: String,
    pub feed_poll_interval: Duration,
    /// Entries unseen for this many successful polls are evicted (0 = never).
    pub state_ttl_polls: u64,
    pub http_timeout: Duration,
    /// Status API port; None when API_PORT=0.
    pub api_port: Option<u16>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} must be set")))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: u64| -> Result<u64> {
            or_default(key, &default.to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config(format!("{key} must be a whole number of seconds")))
        };

        let watchers = WatcherSet::parse(&or_default("WATCHERS", "feed,outbid"))?;

        let feed_poll_secs = secs("FEED_POLL_INTERVAL_SECS", 30)?;
        let outbid_poll_secs = secs("OUTBID_POLL_INTERVAL_SECS", 60)?;
        if feed_poll_secs == 0 || outbid_poll_secs == 0 {
            return Err(AppError::Config("poll intervals must be at least 1 second".to_string()));
        }

        let outbid_policy = or_default("OUTBID_POLICY", "ownership")
            .parse::<OutbidPolicy>()
            .map_err(AppError::Config)?;

        let outbid = if watchers.outbid {
            Some(OutbidConfig {
                driver_id: required("DRIVER_ID").map_err(|_| {
                    AppError::Config(
                        "DRIVER_ID must be set when the outbid watcher is enabled".to_string(),
                    )
                })?,
                poll_interval: Duration::from_secs(outbid_poll_secs),
                policy: outbid_policy,
            })
        } else {
            None
        };

        let http_timeout_secs = secs("HTTP_TIMEOUT_SECS", 15)?;
        if http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP_TIMEOUT_SECS must be at least 1 second".to_string()));
        }

        let state_ttl_polls = or_default("STATE_TTL_POLLS", &DEFAULT_STATE_TTL_POLLS.to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Config("STATE_TTL_POLLS must be a non-negative integer".to_string()))?;

        let api_port = or_default("API_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?;

        Ok(Self {
            auth_token: required("AUTH_TOKEN")?,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            feed_enabled: watchers.feed,
            outbid,
            feed_url: or_default("FEED_URL", FEED_URL),
            active_bids_url: or_default("ACTIVE_BIDS_URL", ACTIVE_BIDS_URL),
            telegram_api_url: or_default("TELEGRAM_API_URL", TELEGRAM_API_URL),
            web_base_url: or_default("WEB_BASE_URL", WEB_BASE_URL),
            feed_poll_interval: Duration::from_secs(feed_poll_secs),
            state_ttl_polls,
            http_timeout: Duration::from_secs(http_timeout_secs),
            api_port: (api_port != 0).then_some(api_port),
            log_level: or_default("LOG_LEVEL", "info"),
        })
    }
}
