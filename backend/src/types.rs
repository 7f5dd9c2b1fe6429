use serde::{Deserialize, Serialize};

/// Number of points in every generated sparkline.
pub const SPARKLINE_POINTS: usize = 24;

/// A single instrument's price, always USD-denominated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Upstream coin id for crypto, `{class}:{symbol}` for synthetic instruments
    pub symbol_id: String,

    /// Uppercase ticker
    pub symbol: String,

    pub display_name: String,

    pub current_price: f64,

    pub price_change_percent_24h: f64,

    /// Zero for synthetic instruments
    pub market_cap: f64,

    /// Zero for synthetic instruments
    pub total_volume_24h: f64,

    pub image_url: Option<String>,

    /// Oldest to newest; the last point equals `current_price`
    pub sparkline: Vec<f64>,
}

impl PriceQuote {
    /// A quote may only leave the service with a positive, finite price.
    pub fn is_usable(&self) -> bool {
        self.current_price.is_finite() && self.current_price > 0.0
    }
}

/// Which price source handles a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    Crypto,
    Forex,
    Metal,
    Stock,
}

impl InstrumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentClass::Crypto => "crypto",
            InstrumentClass::Forex => "forex",
            InstrumentClass::Metal => "metal",
            InstrumentClass::Stock => "stock",
        }
    }
}

/// Single-symbol detail lookup result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DetailedPrice {
    Crypto(CryptoDetail),
    Equity(EquityDetail),
    Synthetic(PriceQuote),
}

impl DetailedPrice {
    pub fn quote(&self) -> &PriceQuote {
        match self {
            DetailedPrice::Crypto(d) => &d.quote,
            DetailedPrice::Equity(d) => &d.quote,
            DetailedPrice::Synthetic(q) => q,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoDetail {
    pub quote: PriceQuote,
    pub rank: Option<u32>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub last_updated: Option<String>,
}

/// Descriptive equity record. Figures besides the price are mock values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityDetail {
    pub quote: PriceQuote,
    pub company_name: String,
    pub sector: String,
    pub exchange: String,
    pub day_high: f64,
    pub day_low: f64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub pe_ratio: f64,
    pub dividend_yield: f64,
}

/// Rolling upstream usage figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub last_hour: usize,
    pub last_24_hours: usize,
    pub projected_monthly: usize,
    /// Percentage of successful calls over the last 24 hours
    pub success_rate: f64,
}
