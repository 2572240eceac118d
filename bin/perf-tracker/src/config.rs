use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tokio::fs::read_to_string;

const DEFAULT_DATABASE_URL: &str = "sqlite://perf-tracker.db";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MATCH_FETCH_CONCURRENCY: usize = 20;
pub const MAX_MATCH_FETCH_CONCURRENCY: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub rgapi_key: String,
    /// Hot cache location. Falls back to an in-process cache when unset.
    pub redis_url: Option<String>,
    pub listen_addr: String,
    pub match_fetch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            rgapi_key: String::new(),
            redis_url: None,
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            match_fetch_concurrency: DEFAULT_MATCH_FETCH_CONCURRENCY,
        }
    }
}

impl Config {
    pub async fn load(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path).await?,
            None => Default::default(),
        };

        config.database_url = std::env::var("DATABASE_URL")
            .ok()
            .unwrap_or(config.database_url);
        config.rgapi_key = std::env::var("RGAPI_KEY").ok().unwrap_or(config.rgapi_key);
        config.redis_url = std::env::var("REDIS_URL").ok().or(config.redis_url);
        config.listen_addr = std::env::var("LISTEN_ADDR")
            .ok()
            .unwrap_or(config.listen_addr);
        if let Ok(concurrency) = std::env::var("MATCH_FETCH_CONCURRENCY") {
            config.match_fetch_concurrency = concurrency
                .parse()
                .context("MATCH_FETCH_CONCURRENCY should be numeric")?;
        }
        config.match_fetch_concurrency = clamp_concurrency(config.match_fetch_concurrency);

        anyhow::ensure!(!config.rgapi_key.is_empty(), "RGAPI_KEY is not set");
        Ok(config)
    }

    async fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = read_to_string(path).await?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Keep the fan-out width within `1..=MAX_MATCH_FETCH_CONCURRENCY`, treating 0
/// as unset.
pub fn clamp_concurrency(concurrency: usize) -> usize {
    match concurrency {
        0 => DEFAULT_MATCH_FETCH_CONCURRENCY,
        n => n.min(MAX_MATCH_FETCH_CONCURRENCY),
    }
}
