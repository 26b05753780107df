use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::health::{HealthRegistry, WatcherSnapshot};

#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthRegistry>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats", get(get_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    /// "ok" while every watcher is running, "degraded" otherwise.
    pub status: &'static str,
    pub watchers: Vec<WatcherHealthResponse>,
}

#[derive(Serialize)]
pub struct WatcherHealthResponse {
    pub name: String,
    pub running: bool,
    pub polls_completed: u64,
    pub fetch_failures: u64,
    pub last_poll_at_ns: u64,
    pub tracked_listings: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub watchers: Vec<WatcherSnapshot>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let watchers: Vec<WatcherHealthResponse> = state
        .health
        .snapshots()
        .into_iter()
        .map(|s| WatcherHealthResponse {
            name: s.name,
            running: s.running,
            polls_completed: s.polls_completed,
            fetch_failures: s.fetch_failures,
            last_poll_at_ns: s.last_poll_at_ns,
            tracked_listings: s.tracked_listings,
        })
        .collect();
    let status = if !watchers.is_empty() && watchers.iter().all(|w| w.running) {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status, watchers })
}

async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        watchers: state.health.snapshots(),
    })
}
