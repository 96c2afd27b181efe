//! Error taxonomy for price lookups and return calculations

use chrono::NaiveDate;
use thiserror::Error;

/// Failures of a single price lookup.
///
/// Everything except [`PriceError::QuotaExceeded`] means "no price for this query":
/// callers check for it and move on. A quota error means the provider refuses further
/// requests and must be surfaced to the user instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PriceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("no data for {symbol} on {date}, available range: {available}")]
    DateNotFound {
        symbol: String,
        date: NaiveDate,
        available: String,
    },

    #[error("field '{field}' not found for {symbol} on {date}")]
    FieldNotFound {
        symbol: String,
        date: NaiveDate,
        field: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PriceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PriceError::QuotaExceeded(_))
    }
}

/// Failures of the portfolio return calculations.
#[derive(Debug, Error)]
pub enum ReturnError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error("no price could be resolved for any holding of portfolio '{portfolio}'")]
    NoResolvablePrices { portfolio: String },
}

/// Failures of a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache storage error: {0}")]
    Storage(#[from] fjall::Error),
}
