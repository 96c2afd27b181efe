//! Price cache contract and merge rules

use crate::core::error::CacheError;
use crate::core::price::{DailyRecord, SeriesKey, TimeSeries, WindowSize};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored series plus the widest window that has ever been merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub window: WindowSize,
    pub series: TimeSeries,
    /// Last date of the newest full fetch. Every session from the first record up to
    /// here has been seen, so a missing date in that span is a market gap.
    #[serde(default)]
    pub full_through: Option<NaiveDate>,
}

impl CacheEntry {
    pub fn new(series: TimeSeries, window: WindowSize) -> Self {
        let mut entry = Self {
            window,
            series: TimeSeries::default(),
            full_through: None,
        };
        entry.merge(&series, window);
        entry
    }

    /// Unions `incoming` into this entry. Incoming records win on date collisions and
    /// a full entry is never downgraded to compact.
    pub fn merge(&mut self, incoming: &TimeSeries, window: WindowSize) {
        for (date, record) in incoming.iter() {
            self.series.insert(*date, record.clone());
        }
        self.window = self.window.max(window);
        if window == WindowSize::Full {
            self.full_through = self.full_through.max(incoming.latest_date());
        }
    }

    pub fn is_full(&self) -> bool {
        self.window == WindowSize::Full
    }

    /// True when `date` falls inside the span a full fetch has already covered.
    pub fn is_known_gap(&self, date: NaiveDate) -> bool {
        match (self.series.earliest_date(), self.full_through) {
            (Some(earliest), Some(through)) => {
                earliest <= date && date <= through && self.series.get(&date).is_none()
            }
            _ => false,
        }
    }
}

#[async_trait]
pub trait PriceCache: Send + Sync {
    /// Exact-date lookup, no interpolation.
    async fn lookup(
        &self,
        key: &SeriesKey,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, CacheError>;

    /// Merges a freshly fetched series into the stored entry for `key`.
    async fn merge(
        &self,
        key: &SeriesKey,
        series: &TimeSeries,
        window: WindowSize,
    ) -> Result<(), CacheError>;

    async fn entry(&self, key: &SeriesKey) -> Result<Option<CacheEntry>, CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series(days: &[(u32, f64)]) -> TimeSeries {
        days.iter()
            .map(|(d, close)| (day(*d), [("4. close", *close)].into_iter().collect()))
            .collect()
    }

    #[test]
    fn test_full_after_compact_upgrades_and_unions() {
        let mut entry = CacheEntry::new(series(&[(10, 1.0), (11, 2.0)]), WindowSize::Compact);
        entry.merge(&series(&[(1, 0.5), (10, 1.5)]), WindowSize::Full);

        assert!(entry.is_full());
        assert_eq!(entry.series.len(), 3);
        // incoming record wins on collision
        assert_eq!(entry.series.get(&day(10)).unwrap().find("close"), Some(1.5));
    }

    #[test]
    fn test_compact_after_full_keeps_full() {
        let mut entry = CacheEntry::new(series(&[(1, 1.0), (2, 2.0)]), WindowSize::Full);
        entry.merge(&series(&[(3, 3.0)]), WindowSize::Compact);

        assert!(entry.is_full());
        assert_eq!(entry.series.len(), 3);
    }

    #[test]
    fn test_known_gap_only_inside_full_span() {
        let mut entry = CacheEntry::new(series(&[(10, 1.0), (12, 2.0)]), WindowSize::Compact);
        assert!(!entry.is_known_gap(day(11)));

        entry.merge(&series(&[(2, 0.5), (3, 0.6), (5, 0.7)]), WindowSize::Full);
        assert_eq!(entry.full_through, Some(day(5)));
        assert!(entry.is_known_gap(day(4)));
        assert!(!entry.is_known_gap(day(3)));
        assert!(!entry.is_known_gap(day(1)));
        // compact data merged later does not extend the full span
        assert!(!entry.is_known_gap(day(11)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let incoming = series(&[(4, 4.0), (5, 5.0)]);
        let mut once = CacheEntry::new(series(&[(1, 1.0)]), WindowSize::Compact);
        once.merge(&incoming, WindowSize::Compact);
        let mut twice = once.clone();
        twice.merge(&incoming, WindowSize::Compact);

        assert_eq!(once, twice);
    }
}
