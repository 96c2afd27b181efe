use crate::core::cache::{CacheEntry, PriceCache};
use crate::core::error::CacheError;
use crate::core::price::{DailyRecord, SeriesKey, TimeSeries, WindowSize};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory price cache. Lookups share a read lock, merges take the write lock.
#[derive(Default)]
pub struct MemoryPriceCache {
    inner: RwLock<HashMap<SeriesKey, CacheEntry>>,
}

impl MemoryPriceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceCache for MemoryPriceCache {
    async fn lookup(
        &self,
        key: &SeriesKey,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, CacheError> {
        let cache = self.inner.read().await;
        let record = cache
            .get(key)
            .and_then(|entry| entry.series.get(&date))
            .cloned();
        if record.is_some() {
            debug!("Cache HIT for {} on {}", key, date);
        } else {
            debug!("Cache MISS for {} on {}", key, date);
        }
        Ok(record)
    }

    async fn merge(
        &self,
        key: &SeriesKey,
        series: &TimeSeries,
        window: WindowSize,
    ) -> Result<(), CacheError> {
        let mut cache = self.inner.write().await;
        cache
            .entry(key.clone())
            .and_modify(|entry| entry.merge(series, window))
            .or_insert_with(|| CacheEntry::new(series.clone(), window));
        debug!("Cache MERGE for {} ({} records, {})", key, series.len(), window);
        Ok(())
    }

    async fn entry(&self, key: &SeriesKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.inner.read().await.get(key).cloned())
    }
}
