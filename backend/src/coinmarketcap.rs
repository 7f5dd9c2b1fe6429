//! CoinMarketCap market-data provider.
//!
//! This is the raw transport seam: it returns listings exactly as the
//! provider reports them. Normalization lives in [`crate::upstream`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{PriceError, Result};

pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

const QUOTES_LATEST_PATH: &str = "/v1/cryptocurrency/quotes/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// One coin as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawListing {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub cmc_rank: Option<u32>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub quote: HashMap<String, RawQuote>,
}

impl RawListing {
    pub fn usd(&self) -> Option<&RawQuote> {
        self.quote.get("USD")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuote {
    pub price: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotesLatestResponse {
    status: ApiStatus,
    #[serde(default)]
    data: HashMap<String, RawListing>,
}

/// Source of raw crypto listings.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest quotes for the given provider symbols in one batched request.
    async fn latest_quotes(&self, provider_symbols: &[String]) -> Result<Vec<RawListing>>;
}

/// HTTP client for the CoinMarketCap Pro API.
pub struct CoinMarketCapProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinMarketCapProvider {
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://pro-api.coinmarketcap.com`
    /// * `api_key` - absent key makes every request fail with a configuration error
    /// * `timeout` - hard per-request timeout
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn quotes_url(&self) -> String {
        format!("{}{}", self.base_url, QUOTES_LATEST_PATH)
    }
}

#[async_trait]
impl MarketDataProvider for CoinMarketCapProvider {
    async fn latest_quotes(&self, provider_symbols: &[String]) -> Result<Vec<RawListing>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PriceError::Config("CMC_API_KEY is not set".to_string()))?;

        if provider_symbols.is_empty() {
            return Ok(Vec::new());
        }

        let symbol_param = provider_symbols.join(",");
        debug!("Requesting CoinMarketCap quotes for {}", symbol_param);

        let response = self
            .client
            .get(self.quotes_url())
            .query(&[("symbol", symbol_param.as_str()), ("convert", "USD")])
            .header(API_KEY_HEADER, api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        parse_quotes_latest(&body)
    }
}

fn status_error(status: StatusCode, body: &str) -> PriceError {
    let message = serde_json::from_str::<QuotesLatestResponse>(body)
        .ok()
        .and_then(|r| r.status.error_message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    PriceError::UpstreamStatus {
        status: status.as_u16(),
        message,
    }
}

/// Parse a `quotes/latest` body into listings.
pub fn parse_quotes_latest(body: &str) -> Result<Vec<RawListing>> {
    let parsed: QuotesLatestResponse = serde_json::from_str(body)?;

    if parsed.status.error_code != 0 {
        return Err(PriceError::Upstream(
            parsed
                .status
                .error_message
                .unwrap_or_else(|| format!("error code {}", parsed.status.error_code)),
        ));
    }

    Ok(parsed.data.into_values().collect())
}
