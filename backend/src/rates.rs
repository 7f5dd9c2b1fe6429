//! Cross-rate conversion.
//!
//! A rate is "1 unit of FROM in units of TO", computed as the ratio of the
//! two USD prices. Rates have their own short-lived cache keyed by the
//! ordered pair; `A-B` and `B-A` are separate entries. There are no fallback
//! tables: an unresolvable side is always an error.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    error::{PairSide, PriceError, Result},
    price_service::PriceService,
    symbols,
    types::PriceQuote,
};

/// Unit of account for the USDT helpers.
pub const USDT: &str = "USDT";

#[derive(Debug, Clone, Copy)]
pub struct RateCacheEntry {
    pub rate: f64,
    pub stored_at: Instant,
}

pub struct RateService {
    prices: PriceService,
    cache: Mutex<HashMap<String, RateCacheEntry>>,
    ttl: Duration,
}

impl RateService {
    pub fn new(prices: PriceService, ttl: Duration) -> Self {
        Self {
            prices,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Units of `to` per one unit of `from`.
    ///
    /// # Errors
    /// * `CurrencyNotFound` - either side has no usable price
    /// * `InvalidRate` - the ratio is not positive and finite
    /// * any price service error, unchanged
    pub async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let from = symbols::normalize(from);
        let to = symbols::normalize(to);

        if from == to {
            return Ok(1.0);
        }

        let pair = format!("{}-{}", from, to);
        if let Some(rate) = self.cached(&pair).await {
            debug!("Rate cache HIT for {}: {}", pair, rate);
            return Ok(rate);
        }

        let (from_quote, to_quote) =
            tokio::try_join!(self.prices.get_price(&from), self.prices.get_price(&to))?;

        let from_price = usable_price(from_quote).ok_or_else(|| PriceError::CurrencyNotFound {
            side: PairSide::From,
            symbol: from.clone(),
        })?;
        let to_price = usable_price(to_quote).ok_or_else(|| PriceError::CurrencyNotFound {
            side: PairSide::To,
            symbol: to.clone(),
        })?;

        let rate = from_price / to_price;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PriceError::InvalidRate { pair, rate });
        }

        debug!("Rate {} = {} ({} / {})", pair, rate, from_price, to_price);
        self.cache.lock().await.insert(
            pair,
            RateCacheEntry {
                rate,
                stored_at: Instant::now(),
            },
        );

        Ok(rate)
    }

    /// `amount` of `from` expressed in `to`.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64> {
        Ok(amount * self.get_rate(from, to).await?)
    }

    pub async fn crypto_to_usdt(&self, amount: f64, currency: &str) -> Result<f64> {
        self.convert(amount, currency, USDT).await
    }

    pub async fn usdt_to_crypto(&self, amount: f64, currency: &str) -> Result<f64> {
        Ok(amount / self.get_rate(currency, USDT).await?)
    }

    async fn cached(&self, pair: &str) -> Option<f64> {
        let cache = self.cache.lock().await;
        let entry = cache.get(pair)?;
        (entry.stored_at.elapsed() < self.ttl).then_some(entry.rate)
    }
}

fn usable_price(quote: Option<PriceQuote>) -> Option<f64> {
    quote.filter(PriceQuote::is_usable).map(|q| q.current_price)
}
