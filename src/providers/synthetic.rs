//! Deterministic price source with no I/O, used for demos and tests.

use crate::core::error::PriceError;
use crate::core::price::{DailyRecord, FetchRequest, PriceSource, TimeSeries, WindowSize};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Calendar days covered by a compact fetch.
const COMPACT_DAYS: i64 = 100;

const FIELDS: [&str; 6] = [
    "1. open",
    "2. high",
    "3. low",
    "4. close",
    "5. volume",
    "6. market cap",
];

/// Quotes every calendar day at `year + month + day`, or at a fixed price when one is set.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    fixed_price: Option<f64>,
    history_start: NaiveDate,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            fixed_price: None,
            history_start: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_price(price: f64) -> Self {
        Self {
            fixed_price: Some(price),
            ..Self::default()
        }
    }

    pub fn price_on(&self, date: NaiveDate) -> f64 {
        self.fixed_price
            .unwrap_or_else(|| (date.year() + date.month() as i32 + date.day() as i32) as f64)
    }

    fn record(&self, date: NaiveDate) -> DailyRecord {
        let price = self.price_on(date);
        FIELDS.iter().map(|name| (*name, price)).collect()
    }
}

#[async_trait]
impl PriceSource for SyntheticSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<TimeSeries, PriceError> {
        let start = match request.window {
            WindowSize::Compact => request.as_of - Duration::days(COMPACT_DAYS - 1),
            WindowSize::Full => self.history_start,
        };
        if let Some(price) = self.fixed_price {
            debug!(price, "Synthetic source using fixed price");
        }

        let series: TimeSeries = start
            .iter_days()
            .take_while(|date| *date <= request.as_of)
            .map(|date| (date, self.record(date)))
            .collect();
        debug!(
            key = %request.key,
            window = %request.window,
            records = series.len(),
            "Generated synthetic series"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::{AssetClass, PriceField, SeriesKey};

    fn request(window: WindowSize, as_of: NaiveDate) -> FetchRequest {
        FetchRequest {
            key: SeriesKey::new("AAPL", AssetClass::Stock),
            window,
            as_of,
        }
    }

    #[test]
    fn test_price_is_sum_of_date_parts() {
        let source = SyntheticSource::new();
        assert_eq!(source.price_on(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap()), 2036.0);
        assert_eq!(source.price_on(NaiveDate::from_ymd_opt(2022, 4, 12).unwrap()), 2038.0);
    }

    #[tokio::test]
    async fn test_compact_window_covers_last_hundred_days() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let series = SyntheticSource::new()
            .fetch(&request(WindowSize::Compact, as_of))
            .await
            .unwrap();

        assert_eq!(series.len(), 100);
        assert_eq!(series.latest_date(), Some(as_of));
        assert_eq!(series.earliest_date(), Some(as_of - Duration::days(99)));
    }

    #[tokio::test]
    async fn test_full_window_and_fixed_price() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let series = SyntheticSource::with_fixed_price(42.5)
            .fetch(&request(WindowSize::Full, as_of))
            .await
            .unwrap();

        let old = NaiveDate::from_ymd_opt(2001, 2, 1).unwrap();
        let record = series.get(&old).unwrap();
        assert_eq!(record.field(PriceField::Close), Some(42.5));
        assert_eq!(record.field(PriceField::MarketCap), Some(42.5));
        assert_eq!(series.earliest_date(), NaiveDate::from_ymd_opt(1990, 1, 1));
    }
}
