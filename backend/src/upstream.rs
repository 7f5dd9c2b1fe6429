//! Upstream price client.
//!
//! Turns our tickers into one batched provider request and normalizes the
//! reply into [`PriceQuote`]s: stablecoin pinning, image URLs and a
//! synthesized sparkline. No caching and no retries here; both belong to
//! the price service.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    coinmarketcap::{MarketDataProvider, RawListing},
    error::{PriceError, Result},
    sparkline, symbols,
    types::{CryptoDetail, PriceQuote},
    usage::UsageLog,
};

pub const QUOTES_ENDPOINT: &str = "quotes/latest";
pub const DETAIL_ENDPOINT: &str = "quotes/latest:detail";

/// Upstream deviation from 1.0 that gets logged when a stablecoin is pinned.
const PIN_LOG_TOLERANCE: f64 = 0.005;

pub fn image_url(upstream_id: u64) -> String {
    format!(
        "https://s2.coinmarketcap.com/static/img/coins/64x64/{}.png",
        upstream_id
    )
}

pub struct UpstreamPriceClient {
    provider: Arc<dyn MarketDataProvider>,
    usage: Arc<UsageLog>,
}

impl UpstreamPriceClient {
    pub fn new(provider: Arc<dyn MarketDataProvider>, usage: Arc<UsageLog>) -> Self {
        Self { provider, usage }
    }

    /// Fetch quotes for crypto tickers in one request.
    ///
    /// Tickers without a provider mapping are left out of the request. The
    /// result is keyed by our uppercase ticker; listings without a usable
    /// price are dropped.
    pub async fn fetch_quotes(&self, tickers: &[String]) -> Result<HashMap<String, PriceQuote>> {
        let mut by_provider: HashMap<&'static str, &str> = HashMap::new();
        for ticker in tickers {
            match symbols::provider_symbol(ticker) {
                Some(provider_symbol) => {
                    by_provider.insert(provider_symbol, ticker.as_str());
                }
                None => debug!("No provider mapping for {}, skipping", ticker),
            }
        }

        if by_provider.is_empty() {
            return Ok(HashMap::new());
        }

        let mut request: Vec<String> = by_provider.keys().map(|s| s.to_string()).collect();
        request.sort();

        let listings = self.call(QUOTES_ENDPOINT, &request).await?;

        let mut quotes = HashMap::with_capacity(listings.len());
        for listing in &listings {
            let provider_symbol = listing.symbol.to_ascii_uppercase();
            let Some(ticker) = by_provider.get(provider_symbol.as_str()) else {
                continue;
            };
            if let Some(quote) = normalize_listing(ticker, listing) {
                quotes.insert(ticker.to_string(), quote);
            }
        }

        debug!("Upstream returned {} of {} requested quotes", quotes.len(), request.len());
        Ok(quotes)
    }

    /// Dedicated single-coin request for the detail view.
    ///
    /// Returns `Ok(None)` when the ticker has no provider mapping or the
    /// provider has no usable price for it.
    pub async fn fetch_detail(&self, ticker: &str) -> Result<Option<CryptoDetail>> {
        let Some(provider_symbol) = symbols::provider_symbol(ticker) else {
            return Ok(None);
        };

        let listings = self
            .call(DETAIL_ENDPOINT, &[provider_symbol.to_string()])
            .await?;

        let detail = listings
            .iter()
            .find(|l| l.symbol.eq_ignore_ascii_case(provider_symbol))
            .and_then(|listing| {
                let quote = normalize_listing(ticker, listing)?;
                let usd = listing.usd().cloned().unwrap_or_default();
                Some(CryptoDetail {
                    quote,
                    rank: listing.cmc_rank,
                    circulating_supply: listing.circulating_supply,
                    total_supply: listing.total_supply,
                    max_supply: listing.max_supply,
                    percent_change_1h: usd.percent_change_1h,
                    percent_change_7d: usd.percent_change_7d,
                    last_updated: listing.last_updated.clone(),
                })
            });

        Ok(detail)
    }

    async fn call(&self, endpoint: &str, provider_symbols: &[String]) -> Result<Vec<RawListing>> {
        let result = self.provider.latest_quotes(provider_symbols).await;

        match &result {
            // No request was made
            Err(PriceError::Config(_)) => {}
            Ok(_) => self.usage.record(endpoint, true),
            Err(e) => {
                warn!("Upstream {} failed: {}", endpoint, e);
                self.usage.record(endpoint, false);
            }
        }

        result
    }
}

/// Build a quote from a raw listing, or `None` if it has no usable price.
pub fn normalize_listing(ticker: &str, listing: &RawListing) -> Option<PriceQuote> {
    let usd = listing.usd().cloned().unwrap_or_default();
    let change = usd
        .percent_change_24h
        .filter(|c| c.is_finite())
        .unwrap_or(0.0);

    let price = if symbols::is_stablecoin(ticker) {
        if let Some(reported) = usd.price {
            if (reported - 1.0).abs() > PIN_LOG_TOLERANCE {
                warn!("Pinning {} to 1.0 (upstream reported {})", ticker, reported);
            }
        }
        1.0
    } else {
        usd.price?
    };

    if !price.is_finite() || price <= 0.0 {
        debug!("Dropping {} with unusable price {}", ticker, price);
        return None;
    }

    Some(PriceQuote {
        symbol_id: listing.id.to_string(),
        symbol: ticker.to_string(),
        display_name: display_name(ticker, listing),
        current_price: price,
        price_change_percent_24h: change,
        market_cap: usd.market_cap.unwrap_or(0.0).max(0.0),
        total_volume_24h: usd.volume_24h.unwrap_or(0.0).max(0.0),
        image_url: Some(image_url(listing.id)),
        sparkline: sparkline::generate(price, change),
    })
}

/// Upstream name, or our table's name when upstream sends none.
fn display_name(ticker: &str, listing: &RawListing) -> String {
    let name = listing.name.trim();
    if name.is_empty() {
        symbols::crypto_name(ticker).unwrap_or(ticker).to_string()
    } else {
        name.to_string()
    }
}
