#![recursion_limit = "256"]

use config::Config;
use handler::persist::{PersistHandler, Persister};
use perf_tracker_db::cache::{HotCache, MemoryCache, RedisCache};
use perf_tracker_db::{DbHandler, SqlitePoolOptions};
use pipeline::{Pipeline, Settings};
use riven::RiotApi;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod handler;
mod http;
mod pipeline;
mod riot_api;

const MEMORY_CACHE_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_tracing_subscriber();

    let config = Config::load(std::env::args().nth(1)).await?;

    // Setup Riot API
    info!("Setting up Riot API client");
    let riot_api = Arc::new(RiotApi::new(config.rgapi_key.as_str()));

    // Setup DB Client
    info!("Setting up DB client");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_handler = Arc::new(DbHandler::new(pool));
    db_handler.migrate().await?;

    info!("Setting up hot cache");
    let hot: Arc<dyn HotCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            info!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new(MEMORY_CACHE_CAPACITY))
        }
    };

    let settings = Settings {
        match_fetch_concurrency: config.match_fetch_concurrency,
        ..Default::default()
    };

    info!("Starting persistence handler");
    let (persist_tx, persist_rx) = unbounded_channel();
    let persist_handler = PersistHandler::new(
        hot.clone(),
        db_handler.clone(),
        persist_rx,
        settings.write_timeout,
    );
    tokio::task::spawn(persist_handler.start());

    let pipeline = Arc::new(Pipeline::new(
        riot_api,
        hot,
        db_handler,
        Persister::new(persist_tx),
        settings,
    ));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);
    axum::serve(listener, http::router(pipeline)).await?;
    Ok(())
}

fn setup_tracing_subscriber() {
    let layer = fmt::layer()
        .pretty()
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_thread_ids(false)
        .with_target(false);
    tracing_subscriber::registry()
        .with(layer)
        .with(EnvFilter::from_default_env())
        .init();
}
