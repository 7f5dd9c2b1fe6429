//! Market price backend
//!
//! Aggregated crypto quotes from an upstream market-data API plus generated
//! forex, metal and equity quotes, with de-duplicated cached fetches and
//! cross-rate conversion.

pub mod api;
pub mod cache;
pub mod coinmarketcap;
pub mod config;
pub mod database;
pub mod error;
pub mod price_service;
pub mod rates;
pub mod sparkline;
pub mod symbols;
pub mod synthetic;
pub mod types;
pub mod upstream;
pub mod usage;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{PriceError, Result};
pub use price_service::{PriceService, PriceServiceBuilder};
pub use rates::RateService;
