//! Synthetic market generators for instruments the live upstream does not cover.
//!
//! Each class has a base price table and a volatility band. Prices are drawn
//! fresh on every call; caching is the price service's job.

use rand::Rng;

use crate::{
    sparkline,
    symbols::{self, StockProfile},
    types::{EquityDetail, InstrumentClass, PriceQuote},
};

/// A price source for one instrument class.
///
/// `price_for` returns `None` for symbols outside the source's table; callers
/// treat that as "unavailable", not as an error.
pub trait InstrumentSource: Send + Sync {
    fn class(&self) -> InstrumentClass;

    fn price_for(&self, symbol: &str) -> Option<PriceQuote>;
}

/// Base-table generator with a per-class volatility profile.
pub struct SyntheticMarket {
    class: InstrumentClass,
    /// (ticker, display name, base price)
    table: Vec<(&'static str, &'static str, f64)>,
    /// Full width of the live-price band as a fraction of the base price
    band: f64,
    /// Cosmetic 24h change is drawn from `±change_range` percent
    change_range: f64,
}

impl SyntheticMarket {
    /// Forex pairs, ±0.05% around base.
    pub fn forex() -> Self {
        Self {
            class: InstrumentClass::Forex,
            table: symbols::FOREX_PAIRS.to_vec(),
            band: 0.001,
            change_range: 0.5,
        }
    }

    /// Precious metals, ±0.5% around base.
    pub fn metals() -> Self {
        Self {
            class: InstrumentClass::Metal,
            table: symbols::METALS.to_vec(),
            band: 0.01,
            change_range: 2.0,
        }
    }

    /// Equities, ±0.3% around base.
    pub fn stocks() -> Self {
        Self {
            class: InstrumentClass::Stock,
            table: symbols::STOCKS
                .iter()
                .map(|p| (p.symbol, p.name, p.base_price))
                .collect(),
            band: 0.006,
            change_range: 3.0,
        }
    }

    pub fn base_price(&self, symbol: &str) -> Option<f64> {
        self.table
            .iter()
            .find(|(s, _, _)| *s == symbol)
            .map(|(_, _, base)| *base)
    }

    /// Quote drawn from an explicit RNG.
    pub fn quote_with<R: Rng + ?Sized>(&self, symbol: &str, rng: &mut R) -> Option<PriceQuote> {
        let (ticker, name, base) = self.table.iter().find(|(s, _, _)| *s == symbol)?;

        let half = self.band / 2.0;
        let current_price = base * (1.0 + rng.gen_range(-half..=half));
        let change = rng.gen_range(-self.change_range..=self.change_range);

        Some(PriceQuote {
            symbol_id: format!("{}:{}", self.class.as_str(), ticker),
            symbol: ticker.to_string(),
            display_name: name.to_string(),
            current_price,
            price_change_percent_24h: change,
            market_cap: 0.0,
            total_volume_24h: 0.0,
            image_url: None,
            sparkline: sparkline::generate_with(current_price, change, rng),
        })
    }
}

impl InstrumentSource for SyntheticMarket {
    fn class(&self) -> InstrumentClass {
        self.class
    }

    fn price_for(&self, symbol: &str) -> Option<PriceQuote> {
        self.quote_with(symbol, &mut rand::thread_rng())
    }
}

/// Mock descriptive record around a live equity quote.
pub fn equity_detail(profile: &StockProfile, quote: PriceQuote) -> EquityDetail {
    equity_detail_with(profile, quote, &mut rand::thread_rng())
}

pub fn equity_detail_with<R: Rng + ?Sized>(
    profile: &StockProfile,
    quote: PriceQuote,
    rng: &mut R,
) -> EquityDetail {
    let price = quote.current_price;
    EquityDetail {
        company_name: profile.name.to_string(),
        sector: profile.sector.to_string(),
        exchange: profile.exchange.to_string(),
        day_high: price * (1.0 + rng.gen_range(0.0..=0.015)),
        day_low: price * (1.0 - rng.gen_range(0.0..=0.015)),
        fifty_two_week_high: profile.base_price * rng.gen_range(1.1..=1.45),
        fifty_two_week_low: profile.base_price * rng.gen_range(0.6..=0.9),
        pe_ratio: rng.gen_range(12.0..=65.0),
        dividend_yield: rng.gen_range(0.0..=2.5),
        quote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SPARKLINE_POINTS;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_gold_stays_within_band() {
        let metals = SyntheticMarket::metals();
        for _ in 0..200 {
            let quote = metals.price_for("GOLD").unwrap();
            assert!(quote.current_price >= 2050.0 * 0.995);
            assert!(quote.current_price <= 2050.0 * 1.005);
            assert_eq!(quote.sparkline.len(), SPARKLINE_POINTS);
            assert_eq!(*quote.sparkline.last().unwrap(), quote.current_price);
        }
    }

    #[test]
    fn test_forex_band_is_tight() {
        let forex = SyntheticMarket::forex();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let quote = forex.quote_with("EURUSD", &mut rng).unwrap();
            assert!((quote.current_price / 1.0850 - 1.0).abs() <= 0.0005 + 1e-12);
            assert!(quote.price_change_percent_24h.abs() <= 0.5);
        }
    }

    #[test]
    fn test_stock_quote_shape() {
        let stocks = SyntheticMarket::stocks();
        let quote = stocks.price_for("AAPL").unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.symbol_id, "stock:AAPL");
        assert_eq!(quote.market_cap, 0.0);
        assert_eq!(quote.total_volume_24h, 0.0);
        assert!((quote.current_price / 189.50 - 1.0).abs() <= 0.003 + 1e-12);
    }

    #[test]
    fn test_unknown_symbol_is_absent() {
        assert!(SyntheticMarket::forex().price_for("GOLD").is_none());
        assert!(SyntheticMarket::metals().price_for("COPPER").is_none());
        assert!(SyntheticMarket::stocks().base_price("BTC").is_none());
    }

    #[test]
    fn test_equity_detail_wraps_quote() {
        let stocks = SyntheticMarket::stocks();
        let profile = symbols::stock_profile("MSFT").unwrap();
        let quote = stocks.price_for("MSFT").unwrap();
        let price = quote.current_price;

        let detail = equity_detail(profile, quote);
        assert_eq!(detail.company_name, "Microsoft Corporation");
        assert!(detail.day_low <= price && price <= detail.day_high);
        assert!(detail.fifty_two_week_low < detail.fifty_two_week_high);
    }
}
