use crate::core::cache::{CacheEntry, PriceCache};
use crate::core::error::CacheError;
use crate::core::price::{DailyRecord, SeriesKey, TimeSeries, WindowSize};
use crate::store::KeyLocks;
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::{debug, warn};

const PARTITION: &str = "prices";

/// Price cache persisted in a fjall keyspace, one JSON encoded entry per series.
pub struct DiskPriceCache {
    _keyspace: Keyspace,
    partition: PartitionHandle,
    locks: KeyLocks,
}

impl DiskPriceCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened price cache at {}", path.display());
        Ok(Self {
            _keyspace: keyspace,
            partition,
            locks: KeyLocks::default(),
        })
    }

    fn read(&self, key: &SeriesKey) -> Result<Option<CacheEntry>, CacheError> {
        match self.partition.get(key.to_string())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PriceCache for DiskPriceCache {
    async fn lookup(
        &self,
        key: &SeriesKey,
        date: NaiveDate,
    ) -> Result<Option<DailyRecord>, CacheError> {
        let record = self
            .read(key)?
            .and_then(|entry| entry.series.get(&date).cloned());
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
        let lock = self.locks.get(key);
        let _guard = lock.lock().await;

        let stored = match self.read(key) {
            Ok(stored) => stored,
            Err(CacheError::Serialization(e)) => {
                warn!("Discarding unreadable cache entry for {}: {}", key, e);
                None
            }
            Err(e) => return Err(e),
        };
        let entry = match stored {
            Some(mut entry) => {
                entry.merge(series, window);
                entry
            }
            None => CacheEntry::new(series.clone(), window),
        };
        self.partition
            .insert(key.to_string().into_bytes(), serde_json::to_vec(&entry)?)?;
        debug!("Cache MERGE for {} ({} records, {})", key, series.len(), entry.window);
        Ok(())
    }

    async fn entry(&self, key: &SeriesKey) -> Result<Option<CacheEntry>, CacheError> {
        self.read(key)
    }
}
