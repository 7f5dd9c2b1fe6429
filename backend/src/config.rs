use std::time::Duration;

use anyhow::{Context, bail};

use crate::{cache, coinmarketcap, usage};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream market-data API key. Crypto fetches fail without it.
    pub cmc_api_key: Option<String>,

    /// Upstream market-data base URL
    pub cmc_base_url: String,

    /// PostgreSQL connection string for the asset-enablement table
    pub database_url: Option<String>,

    /// Server host
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Cache and timeout settings
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// Fresh TTL for batch and detail price caches
    pub price_ttl: Duration,

    /// How long after storing a batch entry it may still be served stale
    pub stale_window: Duration,

    /// Rate cache TTL
    pub rate_ttl: Duration,

    /// Hard timeout for upstream HTTP calls
    pub upstream_timeout: Duration,

    /// Usage ring buffer capacity
    pub usage_log_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            price_ttl: cache::DEFAULT_TTL,
            stale_window: cache::DEFAULT_STALE_WINDOW,
            rate_ttl: Duration::from_secs(60),
            upstream_timeout: Duration::from_secs(10),
            usage_log_capacity: usage::DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = CacheSettings::default();

        let cache = CacheSettings {
            price_ttl: secs_var("PRICE_CACHE_TTL_SECONDS", defaults.price_ttl)?,
            stale_window: secs_var("PRICE_STALE_WINDOW_SECONDS", defaults.stale_window)?,
            rate_ttl: secs_var("RATE_CACHE_TTL_SECONDS", defaults.rate_ttl)?,
            upstream_timeout: secs_var("UPSTREAM_TIMEOUT_SECONDS", defaults.upstream_timeout)?,
            usage_log_capacity: non_empty_var("USAGE_LOG_CAPACITY")
                .map(|v| v.parse::<usize>().context("USAGE_LOG_CAPACITY"))
                .transpose()?
                .unwrap_or(defaults.usage_log_capacity),
        };

        if cache.stale_window <= cache.price_ttl {
            bail!(
                "PRICE_STALE_WINDOW_SECONDS ({}s) must exceed PRICE_CACHE_TTL_SECONDS ({}s)",
                cache.stale_window.as_secs(),
                cache.price_ttl.as_secs()
            );
        }

        Ok(Config {
            cmc_api_key: non_empty_var("CMC_API_KEY"),
            cmc_base_url: non_empty_var("CMC_BASE_URL")
                .unwrap_or_else(|| coinmarketcap::DEFAULT_BASE_URL.to_string()),
            database_url: non_empty_var("DATABASE_URL"),
            server_host: non_empty_var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: non_empty_var("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("SERVER_PORT")?,
            cache,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn secs_var(name: &str, default: Duration) -> anyhow::Result<Duration> {
    match non_empty_var(name) {
        Some(v) => Ok(Duration::from_secs(v.parse::<u64>().context(name.to_string())?)),
        None => Ok(default),
    }
}
