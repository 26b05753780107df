mod api;
mod config;
mod detector;
mod error;
mod fetcher;
mod normalizer;
mod notifier;
mod state;
mod types;
mod watcher;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthRegistry;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{http_client, FetchClient, ListingSource};
use crate::notifier::{Notifier, TelegramConfig, TelegramNotifier};
use crate::watcher::{FeedWatcher, OutbidWatcher};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let client = http_client(cfg.http_timeout)?;
    let health = HealthRegistry::new();

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        client.clone(),
        TelegramConfig {
            api_url: cfg.telegram_api_url.clone(),
            bot_token: cfg.telegram_bot_token.clone(),
            chat_id: cfg.telegram_chat_id.clone(),
            web_base_url: cfg.web_base_url.clone(),
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    // --- Listing feed watcher ---
    if cfg.feed_enabled {
        let source: Arc<dyn ListingSource> = Arc::new(FetchClient::new(
            client.clone(),
            cfg.feed_url.clone(),
            cfg.auth_token.clone(),
        ));
        let feed = FeedWatcher::new(
            source,
            Arc::clone(&notifier),
            cfg.state_ttl_polls,
            health.register("feed"),
        );
        tasks.spawn(watcher::run(feed, cfg.feed_poll_interval, shutdown_rx.clone()));
        info!("Feed watcher polling {} every {:?}", cfg.feed_url, cfg.feed_poll_interval);
    }

    // --- Outbid watcher ---
    if let Some(outbid_cfg) = &cfg.outbid {
        let source: Arc<dyn ListingSource> = Arc::new(FetchClient::new(
            client.clone(),
            cfg.active_bids_url.clone(),
            cfg.auth_token.clone(),
        ));
        let outbid = OutbidWatcher::new(
            source,
            Arc::clone(&notifier),
            outbid_cfg.driver_id.clone(),
            outbid_cfg.policy,
            cfg.state_ttl_polls,
            health.register("outbid"),
        );
        tasks.spawn(watcher::run(outbid, outbid_cfg.poll_interval, shutdown_rx.clone()));
        info!(
            "Outbid watcher polling {} every {:?} (policy: {})",
            cfg.active_bids_url, outbid_cfg.poll_interval, outbid_cfg.policy
        );
    }

    // --- Status API ---
    if let Some(port) = cfg.api_port {
        let app = router(ApiState { health: Arc::clone(&health) });
        let bind_addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        info!("Status API listening on {bind_addr}");

        let mut api_shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = api_shutdown.wait_for(|stop| *stop).await;
                })
                .await;
            if let Err(e) = served {
                error!("Status API stopped: {e}");
            }
        });
    }

    // --- Shutdown on Ctrl-C; watchers finish their current poll first ---
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, waiting for in-flight polls to finish");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("Task ended abnormally: {e}");
        }
    }
    info!("All watchers stopped");

    Ok(())
}
