pub mod disk;
pub mod memory;

use crate::core::cache::PriceCache;
use crate::core::config::{AppConfig, CacheBackend};
use crate::core::price::SeriesKey;
use anyhow::{Context, Result};
use disk::DiskPriceCache;
use memory::MemoryPriceCache;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::debug;

/// One async lock per series, so merges into the same entry run one at a time while
/// unrelated series proceed independently.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<SeriesKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    pub fn get(&self, key: &SeriesKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

/// Builds the cache backend selected in the configuration.
pub fn open_cache(config: &AppConfig) -> Result<Arc<dyn PriceCache>> {
    match config.cache {
        CacheBackend::Memory => {
            debug!("Using in-memory price cache");
            Ok(Arc::new(MemoryPriceCache::new()))
        }
        CacheBackend::Disk => {
            let path = config.default_data_path()?.join("cache");
            let cache = DiskPriceCache::open(&path)
                .with_context(|| format!("Failed to open price cache at {}", path.display()))?;
            Ok(Arc::new(cache))
        }
    }
}
