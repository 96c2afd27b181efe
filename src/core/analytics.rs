//! Provides return calculations for instruments and portfolios on top of a price resolver.
use crate::core::config;
use crate::core::error::{PriceError, ReturnError};
use crate::core::instrument::Instrument;
use crate::core::price::{PriceQuery, ResolvedPrice};
use crate::core::resolver::PriceResolver;
use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Price movement of one instrument between two dates.
#[derive(Debug, Clone)]
pub struct PriceDelta {
    pub instrument: Arc<Instrument>,
    pub from: ResolvedPrice,
    pub to: ResolvedPrice,
    pub delta: f64,
    /// `None` when the starting price is zero.
    pub delta_pct: Option<f64>,
}

/// A named set of instruments, one unit of each.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    pub name: String,
    pub instruments: Vec<Arc<Instrument>>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruments: Vec::new(),
        }
    }

    pub fn add_instrument(&mut self, instrument: Arc<Instrument>) {
        self.instruments.push(instrument);
    }

    pub fn with_instrument(mut self, instrument: Arc<Instrument>) -> Self {
        self.add_instrument(instrument);
        self
    }
}

impl From<&config::Portfolio> for Portfolio {
    fn from(portfolio: &config::Portfolio) -> Self {
        Self {
            name: portfolio.name.clone(),
            instruments: portfolio.actives.iter().cloned().map(Arc::new).collect(),
        }
    }
}

/// A holding left out of a portfolio calculation because its price was unavailable.
#[derive(Debug, Clone)]
pub struct HoldingFailure {
    pub instrument: Arc<Instrument>,
    pub error: PriceError,
}

#[derive(Debug, Clone)]
pub struct OverallReturn {
    pub portfolio: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// `Σdelta / Σprice_from`. 0.01 means 1%.
    pub value: f64,
    pub deltas: Vec<PriceDelta>,
    pub failures: Vec<HoldingFailure>,
}

#[derive(Debug, Clone)]
pub struct AnnualizedReturn {
    pub overall: OverallReturn,
    pub days: i64,
    pub value: f64,
}

fn validate_dates(from: NaiveDate, to: NaiveDate) -> Result<(), ReturnError> {
    if from > to {
        return Err(ReturnError::InvalidInput(format!(
            "from date {from} must not be after to date {to}"
        )));
    }
    Ok(())
}

/// Resolves the close price of `instrument` at both dates and computes the change.
pub async fn price_delta(
    resolver: &PriceResolver,
    instrument: &Arc<Instrument>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PriceDelta, ReturnError> {
    validate_dates(from, to)?;
    debug!(symbol = %instrument.symbol, %from, %to, "Computing price delta");

    let key = instrument.key();
    let query_from = PriceQuery::close(key.clone(), from);
    let query_to = PriceQuery::close(key, to);
    let (price_from, price_to) = futures::join!(
        resolver.resolve(&query_from),
        resolver.resolve(&query_to)
    );
    let (price_from, price_to) = (price_from?, price_to?);

    let delta = price_to.price - price_from.price;
    let delta_pct = (price_from.price != 0.0).then(|| delta / price_from.price);
    debug!(
        symbol = %instrument.symbol,
        from = price_from.price,
        delta,
        ?delta_pct,
        "Price variation"
    );

    Ok(PriceDelta {
        instrument: Arc::clone(instrument),
        from: price_from,
        to: price_to,
        delta,
        delta_pct,
    })
}

/// Overall return of a portfolio between two dates.
pub async fn overall_return(
    resolver: &PriceResolver,
    portfolio: &Portfolio,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<OverallReturn, ReturnError> {
    overall_return_with_progress(resolver, portfolio, from, to, &|| {}).await
}

/// Same as [`overall_return`], calling `update_callback` once per finished holding.
///
/// Holdings whose price is unavailable are skipped and listed in `failures`. A fatal
/// price error aborts the whole calculation, and so does a portfolio where no holding
/// could be priced at all.
pub async fn overall_return_with_progress(
    resolver: &PriceResolver,
    portfolio: &Portfolio,
    from: NaiveDate,
    to: NaiveDate,
    update_callback: &(dyn Fn() + Sync),
) -> Result<OverallReturn, ReturnError> {
    validate_dates(from, to)?;

    let mut result = OverallReturn {
        portfolio: portfolio.name.clone(),
        from,
        to,
        value: 0.0,
        deltas: Vec::new(),
        failures: Vec::new(),
    };
    if portfolio.instruments.is_empty() {
        debug!(portfolio = %portfolio.name, "Portfolio has no holdings");
        return Ok(result);
    }

    info!(portfolio = %portfolio.name, %from, %to, "Calculating overall return");

    let futures = portfolio.instruments.iter().map(|instrument| async move {
        let delta = price_delta(resolver, instrument, from, to).await;
        update_callback();
        (instrument, delta)
    });

    for (instrument, delta) in join_all(futures).await {
        match delta {
            Ok(delta) => result.deltas.push(delta),
            Err(ReturnError::Price(error)) if !error.is_fatal() => {
                warn!(symbol = %instrument.symbol, error = %error, "Skipping holding without price");
                result.failures.push(HoldingFailure {
                    instrument: Arc::clone(instrument),
                    error,
                });
            }
            Err(e) => return Err(e),
        }
    }

    if result.deltas.is_empty() {
        return Err(ReturnError::NoResolvablePrices {
            portfolio: portfolio.name.clone(),
        });
    }

    let total_delta: f64 = result.deltas.iter().map(|d| d.delta).sum();
    let total_from: f64 = result.deltas.iter().map(|d| d.from.price).sum();
    result.value = if total_from == 0.0 {
        0.0
    } else {
        total_delta / total_from
    };
    debug!(portfolio = %portfolio.name, overall = result.value, "Overall return");
    Ok(result)
}

/// Annualized return, `(1 + overall)^(365 / days) - 1`.
///
/// `to` defaults to yesterday, since published prices trail real time by one session.
pub async fn annualized_return(
    resolver: &PriceResolver,
    portfolio: &Portfolio,
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> Result<AnnualizedReturn, ReturnError> {
    annualized_return_with_progress(resolver, portfolio, from, to, &|| {}).await
}

pub async fn annualized_return_with_progress(
    resolver: &PriceResolver,
    portfolio: &Portfolio,
    from: NaiveDate,
    to: Option<NaiveDate>,
    update_callback: &(dyn Fn() + Sync),
) -> Result<AnnualizedReturn, ReturnError> {
    let to = to.unwrap_or_else(|| {
        let yesterday = resolver.today() - Duration::days(1);
        info!(%yesterday, "No end date provided, calculating until yesterday");
        yesterday
    });
    validate_dates(from, to)?;

    let days = (to - from).num_days();
    if days < 1 {
        return Err(ReturnError::InvalidInput(format!(
            "annualized return needs at least one day between {from} and {to}"
        )));
    }
    debug!(days, "Days in period");

    let overall = overall_return_with_progress(resolver, portfolio, from, to, update_callback).await?;
    let value = (1.0 + overall.value).powf(365.0 / days as f64) - 1.0;
    info!(portfolio = %portfolio.name, annualized = value, "Annualized return");

    Ok(AnnualizedReturn {
        overall,
        days,
        value,
    })
}
