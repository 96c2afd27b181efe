//! Pricing abstractions and core types

use crate::core::error::PriceError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AssetClass::Stock => "stock",
                AssetClass::Crypto => "crypto",
            }
        )
    }
}

impl FromStr for AssetClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stock" => Ok(AssetClass::Stock),
            "crypto" => Ok(AssetClass::Crypto),
            _ => Err(anyhow::anyhow!("Invalid asset class: {}", s)),
        }
    }
}

/// Value of a daily candle that can be requested from a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    MarketCap,
}

impl PriceField {
    /// Substring searched for in the provider's field keys ("4. close", "6. market cap (USD)").
    pub fn search_key(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
            PriceField::MarketCap => "market cap",
        }
    }
}

impl Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.search_key())
    }
}

impl FromStr for PriceField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], " ").as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "volume" => Ok(PriceField::Volume),
            "market cap" | "marketcap" => Ok(PriceField::MarketCap),
            _ => Err(anyhow::anyhow!("Invalid price field: {}", s)),
        }
    }
}

/// How much history a fetch asks for. `Compact` is the last ~100 sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSize {
    Compact,
    Full,
}

impl WindowSize {
    pub fn as_param(&self) -> &'static str {
        match self {
            WindowSize::Compact => "compact",
            WindowSize::Full => "full",
        }
    }
}

impl Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

/// Identity of one price series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub asset_class: AssetClass,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            asset_class,
        }
    }
}

impl Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.asset_class, self.symbol)
    }
}

/// One day's values, in the order the provider published them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    fields: Vec<(String, f64)>,
}

impl DailyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// First field whose key contains `needle`. No attempt is made to pick a best match.
    pub fn find(&self, needle: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(key, _)| key.contains(needle))
            .map(|(_, value)| *value)
    }

    pub fn field(&self, field: PriceField) -> Option<f64> {
        self.find(field.search_key())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for DailyRecord {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut record = DailyRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Daily records for one series, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    records: BTreeMap<NaiveDate, DailyRecord>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record already stored for that date.
    pub fn insert(&mut self, date: NaiveDate, record: DailyRecord) {
        self.records.insert(date, record);
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DailyRecord> {
        self.records.get(date)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DailyRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Human readable `[earliest, latest]` range, used in log and error messages.
    pub fn range_label(&self) -> String {
        match (self.earliest_date(), self.latest_date()) {
            (Some(from), Some(to)) => format!("[{from}, {to}]"),
            _ => "[]".to_string(),
        }
    }
}

impl FromIterator<(NaiveDate, DailyRecord)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DailyRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// A single price lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuery {
    pub key: SeriesKey,
    /// `None` means "today".
    pub date: Option<NaiveDate>,
    pub field: PriceField,
}

impl PriceQuery {
    pub fn new(key: SeriesKey, date: Option<NaiveDate>, field: PriceField) -> Self {
        Self { key, date, field }
    }

    pub fn close(key: SeriesKey, date: NaiveDate) -> Self {
        Self::new(key, Some(date), PriceField::Close)
    }
}

/// Outcome of a successful lookup.
///
/// `effective_date` differs from `requested_date` when the requested day was not
/// published yet and the latest available session was used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub key: SeriesKey,
    pub field: PriceField,
    pub requested_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub price: f64,
}

impl ResolvedPrice {
    pub fn is_clamped(&self) -> bool {
        self.requested_date != self.effective_date
    }
}

/// What a source is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub key: SeriesKey,
    pub window: WindowSize,
    /// The resolver's notion of "today". Sources with real data may ignore it.
    pub as_of: NaiveDate,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<TimeSeries, PriceError>;
}
