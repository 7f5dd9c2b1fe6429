use std::fmt;

use thiserror::Error;

/// Which side of a currency pair could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    From,
    To,
}

impl fmt::Display for PairSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairSide::From => write!(f, "from"),
            PairSide::To => write!(f, "to"),
        }
    }
}

/// Errors produced while acquiring, caching or converting prices.
///
/// The type is `Clone` because a single fetch cycle's outcome is handed to
/// every caller that joined it, failures included.
#[derive(Error, Debug, Clone)]
pub enum PriceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned HTTP {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Currency not found: {symbol} ({side} side)")]
    CurrencyNotFound { side: PairSide, symbol: String },

    #[error("Invalid rate for {pair}: {rate}")]
    InvalidRate { pair: String, rate: f64 },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Fetch task failed: {0}")]
    Task(String),
}

impl PriceError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PriceError::Timeout(_)
                | PriceError::UpstreamStatus { .. }
                | PriceError::Upstream(_)
                | PriceError::ParseError(_)
                | PriceError::InvalidRate { .. }
                | PriceError::Task(_)
        )
    }
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PriceError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            PriceError::UpstreamStatus {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_decode() {
            PriceError::ParseError(e.to_string())
        } else {
            PriceError::Upstream(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PriceError {
    fn from(e: serde_json::Error) -> Self {
        PriceError::ParseError(format!("JSON error: {}", e))
    }
}

impl From<sqlx::Error> for PriceError {
    fn from(e: sqlx::Error) -> Self {
        PriceError::DatabaseError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PriceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_not_found_names_symbol_and_side() {
        let err = PriceError::CurrencyNotFound {
            side: PairSide::From,
            symbol: "FAKE".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FAKE"));
        assert!(msg.contains("from side"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PriceError::Timeout("10s".into()).is_retryable());
        assert!(PriceError::Task("join".into()).is_retryable());
        assert!(!PriceError::Config("missing key".into()).is_retryable());
        assert!(!PriceError::UnknownSymbol("FAKE".into()).is_retryable());
        assert!(
            !PriceError::CurrencyNotFound {
                side: PairSide::To,
                symbol: "X".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_json_error_maps_to_parse_error() {
        let err: PriceError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PriceError::ParseError(_)));
    }
}
