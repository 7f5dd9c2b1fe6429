//! In-memory upstream used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    coinmarketcap::{MarketDataProvider, RawListing, RawQuote},
    error::{PriceError, Result},
};

/// Provider symbol -> (upstream id, name, price, 24h change)
fn default_book() -> HashMap<String, (u64, &'static str, f64, f64)> {
    [
        ("BTC", 1, "Bitcoin", 60_000.0, 2.5),
        ("ETH", 1027, "Ethereum", 3_000.0, -1.2),
        ("USDT", 825, "Tether USDt", 0.9993, -0.02),
        ("USDC", 3408, "USDC", 1.0004, 0.01),
        ("DAI", 4943, "Dai", 0.998, 0.0),
        ("SOL", 5426, "Solana", 150.0, 4.0),
        ("POL", 3890, "Polygon", 0.70, -3.0),
    ]
    .into_iter()
    .map(|(s, id, name, price, change)| (s.to_string(), (id, name, price, change)))
    .collect()
}

pub struct MockProvider {
    book: Mutex<HashMap<String, (u64, &'static str, f64, f64)>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
    last_request: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(default_book()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
            last_request: Mutex::new(Vec::new()),
        }
    }

    /// Every request sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_price(&self, provider_symbol: &str, price: f64) {
        if let Some(entry) = self.book.lock().unwrap().get_mut(provider_symbol) {
            entry.2 = price;
        }
    }

    pub fn last_request(&self) -> Vec<String> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn latest_quotes(&self, provider_symbols: &[String]) -> Result<Vec<RawListing>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = provider_symbols.to_vec();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(PriceError::Timeout("mock upstream timed out".to_string()));
        }

        let book = self.book.lock().unwrap();
        Ok(provider_symbols
            .iter()
            .filter_map(|symbol| {
                let (id, name, price, change) = book.get(symbol)?;
                let is_btc = symbol == "BTC";
                Some(RawListing {
                    id: *id,
                    name: name.to_string(),
                    symbol: symbol.clone(),
                    cmc_rank: is_btc.then_some(1),
                    circulating_supply: None,
                    total_supply: None,
                    max_supply: is_btc.then_some(21_000_000.0),
                    last_updated: None,
                    quote: HashMap::from([(
                        "USD".to_string(),
                        RawQuote {
                            price: Some(*price),
                            percent_change_24h: Some(*change),
                            market_cap: Some(price * 1_000_000.0),
                            volume_24h: Some(price * 10_000.0),
                            ..Default::default()
                        },
                    )]),
                })
            })
            .collect())
    }
}
