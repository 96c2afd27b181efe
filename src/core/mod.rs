//! Core business logic abstractions

pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod instrument;
pub mod log;
pub mod price;
pub mod resolver;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, PriceCache};
pub use error::{CacheError, PriceError, ReturnError};
pub use instrument::Instrument;
pub use price::{
    AssetClass, DailyRecord, FetchRequest, PriceField, PriceQuery, PriceSource, ResolvedPrice,
    SeriesKey, TimeSeries, WindowSize,
};
pub use resolver::PriceResolver;
