//! Resolves a (symbol, date, field) query to a price, going through the cache first and
//! falling back to the configured price source.

use crate::core::cache::PriceCache;
use crate::core::error::PriceError;
use crate::core::price::{
    DailyRecord, FetchRequest, PriceQuery, PriceSource, ResolvedPrice, SeriesKey, TimeSeries,
    WindowSize,
};
use chrono::{Duration, NaiveDate, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, instrument, warn};

/// Dates at least this many days old are outside the compact window and need a full fetch.
pub const FRESHNESS_THRESHOLD_DAYS: i64 = 99;

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;
type FetchKey = (SeriesKey, WindowSize);
type SharedFetch = Shared<BoxFuture<'static, Result<Arc<TimeSeries>, PriceError>>>;
type InFlight = Arc<Mutex<HashMap<FetchKey, SharedFetch>>>;

/// Picks the cheapest window that still covers `date`.
pub fn select_window(date: NaiveDate, today: NaiveDate) -> WindowSize {
    if date <= today - Duration::days(FRESHNESS_THRESHOLD_DAYS) {
        WindowSize::Full
    } else {
        WindowSize::Compact
    }
}

pub struct PriceResolver {
    source: Arc<dyn PriceSource>,
    cache: Arc<dyn PriceCache>,
    clock: Clock,
    in_flight: InFlight,
}

impl PriceResolver {
    pub fn new(source: Arc<dyn PriceSource>, cache: Arc<dyn PriceCache>) -> Self {
        Self {
            source,
            cache,
            clock: Arc::new(|| Utc::now().date_naive()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replaces the system clock used for "today".
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    #[instrument(
        name = "ResolvePrice",
        skip(self),
        fields(key = %query.key, field = %query.field)
    )]
    pub async fn resolve(&self, query: &PriceQuery) -> Result<ResolvedPrice, PriceError> {
        let today = self.today();
        let date = match query.date {
            Some(date) => date,
            None => {
                warn!(
                    %today,
                    "No observation date provided, using today. Published data trails real time by one session"
                );
                today
            }
        };

        match self.cache.lookup(&query.key, date).await {
            Ok(Some(record)) => {
                debug!(%date, "Price served from cache");
                return extract(query, date, date, &record);
            }
            Ok(None) => {
                if let Some(available) = self.cached_gap(&query.key, date).await {
                    debug!(%date, %available, "Date is a gap in cached full history");
                    return Err(PriceError::DateNotFound {
                        symbol: query.key.symbol.clone(),
                        date,
                        available,
                    });
                }
                debug!(%date, "Price not cached, fetching from source");
            }
            Err(e) => warn!(error = %e, "Cache lookup failed, fetching from source"),
        }

        let request = FetchRequest {
            key: query.key.clone(),
            window: select_window(date, today),
            as_of: today,
        };
        let series = self.fetch_shared(request).await?;

        let latest = series.latest_date().ok_or_else(|| PriceError::DateNotFound {
            symbol: query.key.symbol.clone(),
            date,
            available: series.range_label(),
        })?;

        let effective = if date > latest {
            warn!(
                requested = %date,
                %latest,
                "Requested date is not published yet, using latest available session"
            );
            latest
        } else {
            date
        };

        let record = series.get(&effective).ok_or_else(|| {
            debug!(%effective, range = %series.range_label(), "Date not found in series");
            PriceError::DateNotFound {
                symbol: query.key.symbol.clone(),
                date: effective,
                available: series.range_label(),
            }
        })?;

        extract(query, date, effective, record)
    }

    /// Range label of the cached series when `date` is a session the full history
    /// already skipped, so asking the source again cannot help.
    async fn cached_gap(&self, key: &SeriesKey, date: NaiveDate) -> Option<String> {
        match self.cache.entry(key).await {
            Ok(Some(entry)) if entry.is_known_gap(date) => Some(entry.series.range_label()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Cache entry unavailable, fetching from source");
                None
            }
        }
    }

    /// Returns the in-flight fetch for the request's key and window, starting one if none
    /// is running. Every caller of the same fetch observes the same result.
    fn fetch_shared(&self, request: FetchRequest) -> SharedFetch {
        let fetch_key = (request.key.clone(), request.window);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = in_flight.get(&fetch_key) {
            debug!(key = %request.key, window = %request.window, "Joining in-flight fetch");
            return running.clone();
        }

        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.in_flight);
        let registry_key = fetch_key.clone();
        let fetch = async move {
            let result = fetch_and_store(source.as_ref(), cache.as_ref(), &request).await;
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&registry_key);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(fetch_key, fetch.clone());
        fetch
    }
}

async fn fetch_and_store(
    source: &dyn PriceSource,
    cache: &dyn PriceCache,
    request: &FetchRequest,
) -> Result<Arc<TimeSeries>, PriceError> {
    info!(key = %request.key, window = %request.window, "Fetching price series from source");

    let series = source.fetch(request).await.inspect_err(|e| {
        if e.is_fatal() {
            error!(key = %request.key, error = %e, "Price source refused the request");
        } else {
            warn!(key = %request.key, error = %e, "Price source returned no usable data");
        }
    })?;
    debug!(records = series.len(), range = %series.range_label(), "Fetched series");

    if let Err(e) = cache.merge(&request.key, &series, request.window).await {
        warn!(key = %request.key, error = %e, "Failed to store fetched series in cache");
    }

    Ok(Arc::new(series))
}

fn extract(
    query: &PriceQuery,
    requested: NaiveDate,
    effective: NaiveDate,
    record: &DailyRecord,
) -> Result<ResolvedPrice, PriceError> {
    let price = record
        .field(query.field)
        .ok_or_else(|| PriceError::FieldNotFound {
            symbol: query.key.symbol.clone(),
            date: effective,
            field: query.field.to_string(),
        })?;

    debug!(symbol = %query.key.symbol, %effective, price, "Resolved price");
    Ok(ResolvedPrice {
        key: query.key.clone(),
        field: query.field,
        requested_date: requested,
        effective_date: effective,
        price,
    })
}
