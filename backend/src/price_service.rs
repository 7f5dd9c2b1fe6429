//! Price Service
//!
//! The single entry point for price data. It owns the batch cache, the
//! in-flight table and the usage log, and decides where each symbol's price
//! comes from.
//!
//! # Request flow
//! ```text
//! get_prices(symbols)
//!   → narrow to enabled assets (directory failure ⇒ unfiltered)
//!   → key = sorted symbols
//!   → fresh entry?          → return it
//!   → fetch already running? → await the same result
//!   → start fetch cycle:   crypto → upstream client
//!                          forex / metal / stock → instrument sources
//!        success → cache (fresh 60s, usable stale 5min) → return
//!        failure → stale entry? → return it
//!                            else → error
//! ```
//!
//! The cache check and the in-flight registration happen under one lock, so
//! concurrent callers with the same key never start a second fetch cycle.
//! Fetch cycles run on their own task and complete even if every caller
//! goes away.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::{
    cache::{CacheStats, TtlCache, cache_key},
    coinmarketcap::{CoinMarketCapProvider, MarketDataProvider},
    config::{CacheSettings, Config},
    database::AssetDirectory,
    error::{PriceError, Result},
    symbols,
    synthetic::{self, InstrumentSource, SyntheticMarket},
    types::{DetailedPrice, InstrumentClass, PriceQuote, UsageStats},
    upstream::UpstreamPriceClient,
    usage::UsageLog,
};

type Quotes = Arc<Vec<PriceQuote>>;
type InFlight = Shared<BoxFuture<'static, Result<Quotes>>>;

/// Classes served by instrument sources, in merge order.
const SYNTHETIC_CLASSES: [InstrumentClass; 3] = [
    InstrumentClass::Forex,
    InstrumentClass::Metal,
    InstrumentClass::Stock,
];

struct BatchState {
    cache: TtlCache<Vec<PriceQuote>>,
    in_flight: HashMap<String, InFlight>,
}

struct Inner {
    upstream: UpstreamPriceClient,
    sources: HashMap<InstrumentClass, Arc<dyn InstrumentSource>>,
    directory: Option<Arc<dyn AssetDirectory>>,
    batch: Mutex<BatchState>,
    details: Mutex<TtlCache<DetailedPrice>>,
    usage: Arc<UsageLog>,
}

/// Cheap to clone; every clone shares one cache.
#[derive(Clone)]
pub struct PriceService {
    inner: Arc<Inner>,
}

pub struct PriceServiceBuilder {
    provider: Arc<dyn MarketDataProvider>,
    directory: Option<Arc<dyn AssetDirectory>>,
    sources: HashMap<InstrumentClass, Arc<dyn InstrumentSource>>,
    settings: CacheSettings,
}

impl PriceServiceBuilder {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            directory: None,
            sources: HashMap::new(),
            settings: CacheSettings::default(),
        }
        .instrument_source(Arc::new(SyntheticMarket::forex()))
        .instrument_source(Arc::new(SyntheticMarket::metals()))
        .instrument_source(Arc::new(SyntheticMarket::stocks()))
    }

    /// Builder wired to CoinMarketCap using the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = CoinMarketCapProvider::new(
            &config.cmc_base_url,
            config.cmc_api_key.clone(),
            config.cache.upstream_timeout,
        )?;
        Ok(Self::new(Arc::new(provider)).settings(config.cache))
    }

    pub fn settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn asset_directory(mut self, directory: Arc<dyn AssetDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Replace the source for the class `source` reports. Crypto always goes
    /// through the upstream client; a crypto source is ignored.
    pub fn instrument_source(mut self, source: Arc<dyn InstrumentSource>) -> Self {
        let class = source.class();
        if class == InstrumentClass::Crypto {
            warn!("Ignoring instrument source registered for crypto");
        } else {
            self.sources.insert(class, source);
        }
        self
    }

    pub fn build(self) -> PriceService {
        let usage = Arc::new(UsageLog::new(self.settings.usage_log_capacity));
        let inner = Inner {
            upstream: UpstreamPriceClient::new(self.provider, usage.clone()),
            sources: self.sources,
            directory: self.directory,
            batch: Mutex::new(BatchState {
                cache: TtlCache::new(self.settings.price_ttl, self.settings.stale_window),
                in_flight: HashMap::new(),
            }),
            details: Mutex::new(TtlCache::fresh_only(self.settings.price_ttl)),
            usage,
        };
        PriceService {
            inner: Arc::new(inner),
        }
    }
}

impl PriceService {
    pub fn builder(provider: Arc<dyn MarketDataProvider>) -> PriceServiceBuilder {
        PriceServiceBuilder::new(provider)
    }

    /// Prices for `symbols`, or for every known symbol when `None`.
    ///
    /// # Errors
    /// Fails only when the crypto fetch fails and no fresh or stale entry
    /// exists for the same symbol set. Unknown symbols are simply absent
    /// from the result.
    pub async fn get_prices(&self, symbols: Option<&[String]>) -> Result<Quotes> {
        let resolved = self.resolve_symbols(symbols).await;
        if resolved.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let key = cache_key(&resolved);

        let pending = {
            let mut state = self.inner.batch.lock().await;

            if let Some(hit) = state.cache.get_fresh(&key, Instant::now()) {
                debug!("Cache HIT for {}", key);
                return Ok(hit);
            }

            match state.in_flight.get(&key).cloned() {
                Some(running) => {
                    debug!("Joining in-flight fetch for {}", key);
                    running
                }
                None => {
                    debug!("Cache MISS for {}, starting fetch cycle", key);
                    let inner = self.inner.clone();
                    let cycle_key = key.clone();
                    let handle = {
                        let inner = inner.clone();
                        let cycle_key = cycle_key.clone();
                        tokio::spawn(async move { inner.run_fetch_cycle(cycle_key, resolved).await })
                    };

                    // A task that never finished its cycle still holds the ticket
                    let shared = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => {
                                let failed = Err(PriceError::Task(e.to_string()));
                                inner.settle(cycle_key, failed).await
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    state.in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        pending.await
    }

    /// Single-symbol lookup.
    ///
    /// Forex, metal and stock symbols go straight to their source. Crypto
    /// symbols go through [`get_prices`](Self::get_prices) to share its cache
    /// and deduplication. `Ok(None)` means no source knows the symbol.
    pub async fn get_price(&self, symbol: &str) -> Result<Option<PriceQuote>> {
        let symbol = symbols::normalize(symbol);

        match symbols::classify(&symbol) {
            None => Ok(None),
            Some(InstrumentClass::Crypto) => {
                let quotes = self.get_prices(Some(&[symbol.clone()])).await?;
                Ok(quotes.iter().find(|q| q.symbol == symbol).cloned())
            }
            Some(class) => Ok(self.synthetic_quote(class, &symbol)),
        }
    }

    /// Detail record with its own fresh-only cache.
    ///
    /// Crypto uses a dedicated upstream call outside the batch cache;
    /// equities get a mock descriptive record; forex and metals return
    /// their synthetic quote.
    pub async fn get_detailed_price(&self, symbol: &str) -> Result<Option<DetailedPrice>> {
        let symbol = symbols::normalize(symbol);
        let Some(class) = symbols::classify(&symbol) else {
            return Ok(None);
        };

        if let Some(hit) = self.inner.details.lock().await.get_fresh(&symbol, Instant::now()) {
            debug!("Detail cache HIT for {}", symbol);
            return Ok(Some(hit.as_ref().clone()));
        }

        let detail = match class {
            InstrumentClass::Crypto => self
                .inner
                .upstream
                .fetch_detail(&symbol)
                .await?
                .map(DetailedPrice::Crypto),
            InstrumentClass::Stock => symbols::stock_profile(&symbol)
                .zip(self.synthetic_quote(class, &symbol))
                .map(|(profile, quote)| DetailedPrice::Equity(synthetic::equity_detail(profile, quote))),
            InstrumentClass::Forex | InstrumentClass::Metal => self
                .synthetic_quote(class, &symbol)
                .map(DetailedPrice::Synthetic),
        };

        if let Some(detail) = &detail {
            debug!("Detail for {} at {}", symbol, detail.quote().current_price);
            self.inner
                .details
                .lock()
                .await
                .insert(symbol, Arc::new(detail.clone()), Instant::now());
        }

        Ok(detail)
    }

    pub fn get_usage_stats(&self) -> UsageStats {
        self.inner.usage.stats()
    }

    /// Empty both price caches. Running fetch cycles, the rate cache and the
    /// usage log are untouched.
    pub async fn clear_cache(&self) {
        self.inner.batch.lock().await.cache.clear();
        self.inner.details.lock().await.clear();
        debug!("Price caches cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        let (price_entries, in_flight, ttl, stale_window) = {
            let state = self.inner.batch.lock().await;
            (
                state.cache.len(),
                state.in_flight.len(),
                state.cache.ttl(),
                state.cache.stale_window(),
            )
        };
        let detail_entries = self.inner.details.lock().await.len();

        CacheStats {
            price_entries,
            detail_entries,
            in_flight,
            ttl_seconds: ttl.as_secs(),
            stale_window_seconds: stale_window.as_secs(),
        }
    }

    pub fn known_symbols(&self) -> Vec<String> {
        symbols::all_symbols()
    }

    fn synthetic_quote(&self, class: InstrumentClass, symbol: &str) -> Option<PriceQuote> {
        self.inner
            .sources
            .get(&class)?
            .price_for(symbol)
            .filter(PriceQuote::is_usable)
    }

    /// Normalized, sorted, de-duplicated symbol list after the enabled filter.
    async fn resolve_symbols(&self, requested: Option<&[String]>) -> Vec<String> {
        let mut resolved: Vec<String> = match requested {
            Some(list) => list
                .iter()
                .map(|s| symbols::normalize(s))
                .filter(|s| !s.is_empty())
                .collect(),
            None => symbols::all_symbols(),
        };
        resolved.sort();
        resolved.dedup();

        let Some(directory) = &self.inner.directory else {
            return resolved;
        };

        match directory.enabled_assets().await {
            Ok(assets) => {
                let enabled: HashSet<String> = assets
                    .iter()
                    .map(|a| symbols::normalize(&a.asset_symbol))
                    .collect();
                resolved.retain(|s| enabled.contains(s));
                resolved
            }
            Err(e) => {
                warn!("Asset directory unavailable, using requested symbols unfiltered: {}", e);
                resolved
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "fetch cycle panicked".to_string())
}

impl Inner {
    /// One fetch cycle for `key`. A panicking source or provider ends the
    /// cycle with `PriceError::Task`.
    async fn run_fetch_cycle(self: Arc<Self>, key: String, symbols: Vec<String>) -> Result<Quotes> {
        let outcome = AssertUnwindSafe(self.fetch_all(&symbols))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PriceError::Task(panic_message(panic.as_ref()))));

        self.settle(key, outcome).await
    }

    /// Release the in-flight ticket for `key`, then cache a success or fall
    /// back to a usable stale entry.
    async fn settle(&self, key: String, outcome: Result<Vec<PriceQuote>>) -> Result<Quotes> {
        let mut state = self.batch.lock().await;
        state.in_flight.remove(&key);
        let now = Instant::now();

        match outcome {
            Ok(quotes) => {
                debug!("Cached {} quotes for {}", quotes.len(), key);
                let quotes = Arc::new(quotes);
                state.cache.insert(key, quotes.clone(), now);
                Ok(quotes)
            }
            Err(e) => match state.cache.get_usable(&key, now) {
                Some((stale, _)) => {
                    warn!("Serving stale prices for {} after fetch failure: {}", key, e);
                    Ok(stale)
                }
                None => {
                    error!("Price fetch for {} failed with no cached fallback: {}", key, e);
                    Err(e)
                }
            },
        }
    }

    async fn fetch_all(&self, symbols: &[String]) -> Result<Vec<PriceQuote>> {
        let mut buckets: HashMap<InstrumentClass, Vec<String>> = HashMap::new();
        for symbol in symbols {
            match symbols::classify(symbol) {
                Some(class) => buckets.entry(class).or_default().push(symbol.clone()),
                None => debug!("Unknown symbol {}, skipping", symbol),
            }
        }

        let crypto = buckets.remove(&InstrumentClass::Crypto).unwrap_or_default();

        let mut synthetic = Vec::new();
        for class in SYNTHETIC_CLASSES {
            let (Some(source), Some(members)) = (self.sources.get(&class), buckets.get(&class)) else {
                continue;
            };
            synthetic.extend(members.iter().filter_map(|s| source.price_for(s)));
        }

        let mut live = if crypto.is_empty() {
            HashMap::new()
        } else {
            self.upstream.fetch_quotes(&crypto).await?
        };

        let merged: Vec<PriceQuote> = crypto
            .iter()
            .filter_map(|s| live.remove(s))
            .chain(synthetic)
            .filter(PriceQuote::is_usable)
            .collect();

        Ok(merged)
    }
}
