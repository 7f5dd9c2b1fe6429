//! Static instrument membership tables.
//!
//! Every symbol belongs to exactly one class. A ticker listed in two tables is
//! a configuration error; `classify` checks the tables in a fixed order and
//! does not try to detect it.

use crate::types::InstrumentClass;

/// Upstream-tracked cryptocurrencies: (ticker, provider symbol, display name).
pub const CRYPTO_SYMBOLS: &[(&str, &str, &str)] = &[
    ("BTC", "BTC", "Bitcoin"),
    ("ETH", "ETH", "Ethereum"),
    ("USDT", "USDT", "Tether USDt"),
    ("BNB", "BNB", "BNB"),
    ("SOL", "SOL", "Solana"),
    ("XRP", "XRP", "XRP"),
    ("USDC", "USDC", "USDC"),
    ("ADA", "ADA", "Cardano"),
    ("DOGE", "DOGE", "Dogecoin"),
    ("TRX", "TRX", "TRON"),
    ("AVAX", "AVAX", "Avalanche"),
    ("DOT", "DOT", "Polkadot"),
    ("LINK", "LINK", "Chainlink"),
    ("MATIC", "POL", "Polygon"),
    ("SHIB", "SHIB", "Shiba Inu"),
    ("LTC", "LTC", "Litecoin"),
    ("BCH", "BCH", "Bitcoin Cash"),
    ("UNI", "UNI", "Uniswap"),
    ("XLM", "XLM", "Stellar"),
    ("ATOM", "ATOM", "Cosmos"),
    ("ETC", "ETC", "Ethereum Classic"),
    ("FIL", "FIL", "Filecoin"),
    ("APT", "APT", "Aptos"),
    ("ARB", "ARB", "Arbitrum"),
    ("OP", "OP", "Optimism"),
    ("NEAR", "NEAR", "NEAR Protocol"),
    ("ICP", "ICP", "Internet Computer"),
    ("VET", "VET", "VeChain"),
    ("DAI", "DAI", "Dai"),
    ("TON", "TON", "Toncoin"),
];

/// Prices of these are pinned to exactly 1.0.
pub const STABLECOINS: &[&str] = &["USDT", "USDC", "DAI"];

/// Forex pairs: (ticker, display name, base price).
pub const FOREX_PAIRS: &[(&str, &str, f64)] = &[
    ("EURUSD", "Euro / US Dollar", 1.0850),
    ("GBPUSD", "British Pound / US Dollar", 1.2650),
    ("USDJPY", "US Dollar / Japanese Yen", 149.50),
    ("USDCHF", "US Dollar / Swiss Franc", 0.8800),
    ("AUDUSD", "Australian Dollar / US Dollar", 0.6550),
    ("USDCAD", "US Dollar / Canadian Dollar", 1.3550),
    ("NZDUSD", "New Zealand Dollar / US Dollar", 0.6100),
    ("EURGBP", "Euro / British Pound", 0.8580),
];

/// Precious metals per troy ounce: (ticker, display name, base price).
pub const METALS: &[(&str, &str, f64)] = &[
    ("GOLD", "Gold", 2050.0),
    ("SILVER", "Silver", 24.50),
    ("PLATINUM", "Platinum", 950.0),
    ("PALLADIUM", "Palladium", 1050.0),
];

/// Equity profile backing the stock generator and its detail mock.
#[derive(Debug, Clone, Copy)]
pub struct StockProfile {
    pub symbol: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
    pub exchange: &'static str,
    pub base_price: f64,
}

pub const STOCKS: &[StockProfile] = &[
    StockProfile { symbol: "AAPL", name: "Apple Inc.", sector: "Technology", exchange: "NASDAQ", base_price: 189.50 },
    StockProfile { symbol: "MSFT", name: "Microsoft Corporation", sector: "Technology", exchange: "NASDAQ", base_price: 415.20 },
    StockProfile { symbol: "GOOGL", name: "Alphabet Inc.", sector: "Communication Services", exchange: "NASDAQ", base_price: 142.80 },
    StockProfile { symbol: "AMZN", name: "Amazon.com Inc.", sector: "Consumer Cyclical", exchange: "NASDAQ", base_price: 178.30 },
    StockProfile { symbol: "TSLA", name: "Tesla Inc.", sector: "Consumer Cyclical", exchange: "NASDAQ", base_price: 245.60 },
    StockProfile { symbol: "NVDA", name: "NVIDIA Corporation", sector: "Technology", exchange: "NASDAQ", base_price: 875.40 },
    StockProfile { symbol: "META", name: "Meta Platforms Inc.", sector: "Communication Services", exchange: "NASDAQ", base_price: 495.10 },
    StockProfile { symbol: "NFLX", name: "Netflix Inc.", sector: "Communication Services", exchange: "NASDAQ", base_price: 610.70 },
    StockProfile { symbol: "JPM", name: "JPMorgan Chase & Co.", sector: "Financial Services", exchange: "NYSE", base_price: 195.30 },
    StockProfile { symbol: "V", name: "Visa Inc.", sector: "Financial Services", exchange: "NYSE", base_price: 275.90 },
];

/// Uppercases and trims a caller-supplied ticker.
pub fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Instrument class of an already-normalized ticker.
pub fn classify(symbol: &str) -> Option<InstrumentClass> {
    if CRYPTO_SYMBOLS.iter().any(|(s, _, _)| *s == symbol) {
        Some(InstrumentClass::Crypto)
    } else if FOREX_PAIRS.iter().any(|(s, _, _)| *s == symbol) {
        Some(InstrumentClass::Forex)
    } else if METALS.iter().any(|(s, _, _)| *s == symbol) {
        Some(InstrumentClass::Metal)
    } else if STOCKS.iter().any(|p| p.symbol == symbol) {
        Some(InstrumentClass::Stock)
    } else {
        None
    }
}

/// Provider-side symbol for one of our crypto tickers.
pub fn provider_symbol(symbol: &str) -> Option<&'static str> {
    CRYPTO_SYMBOLS
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, provider, _)| *provider)
}

pub fn crypto_name(symbol: &str) -> Option<&'static str> {
    CRYPTO_SYMBOLS
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, _, name)| *name)
}

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.contains(&symbol)
}

pub fn stock_profile(symbol: &str) -> Option<&'static StockProfile> {
    STOCKS.iter().find(|p| p.symbol == symbol)
}

/// Every symbol across all tables, in table order.
pub fn all_symbols() -> Vec<String> {
    CRYPTO_SYMBOLS
        .iter()
        .map(|(s, _, _)| *s)
        .chain(FOREX_PAIRS.iter().map(|(s, _, _)| *s))
        .chain(METALS.iter().map(|(s, _, _)| *s))
        .chain(STOCKS.iter().map(|p| p.symbol))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_are_mutually_exclusive() {
        let all = all_symbols();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len(), "a ticker appears in two tables");
    }

    #[test]
    fn test_crypto_table_lists_thirty_tickers() {
        assert_eq!(CRYPTO_SYMBOLS.len(), 30);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("BTC"), Some(InstrumentClass::Crypto));
        assert_eq!(classify("EURUSD"), Some(InstrumentClass::Forex));
        assert_eq!(classify("GOLD"), Some(InstrumentClass::Metal));
        assert_eq!(classify("AAPL"), Some(InstrumentClass::Stock));
        assert_eq!(classify("FAKE"), None);
    }

    #[test]
    fn test_provider_symbol_translation() {
        assert_eq!(provider_symbol("MATIC"), Some("POL"));
        assert_eq!(provider_symbol("BTC"), Some("BTC"));
        assert_eq!(provider_symbol("GOLD"), None);
    }

    #[test]
    fn test_stablecoins_are_crypto() {
        for s in STABLECOINS {
            assert_eq!(classify(s), Some(InstrumentClass::Crypto));
        }
        assert!(is_stablecoin("DAI"));
        assert!(!is_stablecoin("BTC"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  btc "), "BTC");
    }
}
