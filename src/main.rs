mod commands;
mod config;
mod context;
mod db;
mod delivery;
mod engine;
mod error;
mod fetcher;
mod models;
mod processor;
#[cfg(test)]
mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use commands::WebhookReplier;
use config::AppConfig;
use context::AppContext;
use delivery::{CdnUploader, MapPublisher, SlackClient, PngMapRenderer};
use fetcher::FlightAwareFetcher;
use processor::{PollSettings, Poller};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting flight tracker...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");

    let fetcher = FlightAwareFetcher::new(
        &config.flightaware_base_url,
        Duration::from_secs(config.fetch_timeout_secs),
    )?;
    let sink = SlackClient::new(&config.slack_api_url, &config.slack_bot_token)?;
    let replier = WebhookReplier::new(Duration::from_secs(config.fetch_timeout_secs))?;
    let maps = match &config.cdn_upload_url {
        Some(url) => Some(MapPublisher::new(
            Arc::new(PngMapRenderer),
            Arc::new(CdnUploader::new(url)?),
        )),
        None => {
            warn!("CDN_UPLOAD_URL not set; cruise updates will be sent without a map");
            None
        }
    };

    let ctx = Arc::new(AppContext {
        store: Arc::new(db::PgFlightStore::new(pool)),
        fetcher: Arc::new(fetcher),
        sink: Arc::new(sink),
        maps,
        replier: Arc::new(replier),
    });

    // Command endpoints
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Bot is running on port {}", config.port);
    let app = commands::router(ctx.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server stopped: {}", e);
        }
    });

    let poller = Poller::new(ctx, PollSettings::from_config(&config));
    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
