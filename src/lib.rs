pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::price::{AssetClass, PriceField, PriceQuery, SeriesKey};
use crate::core::resolver::PriceResolver;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

pub enum AppCommand {
    Price {
        symbol: String,
        asset_class: AssetClass,
        date: Option<NaiveDate>,
        field: PriceField,
    },
    Returns {
        from: NaiveDate,
        to: Option<NaiveDate>,
    },
}

/// Wires the configured price source and cache into a resolver.
pub fn build_resolver(config: &AppConfig) -> Result<PriceResolver> {
    let source = providers::build_source(config)?;
    let cache = store::open_cache(config)?;
    Ok(PriceResolver::new(source, cache))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("pricefolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let resolver = build_resolver(&config)?;

    match command {
        AppCommand::Price {
            symbol,
            asset_class,
            date,
            field,
        } => {
            let query = PriceQuery::new(SeriesKey::new(symbol, asset_class), date, field);
            cli::price::run(&resolver, &query).await
        }
        AppCommand::Returns { from, to } => {
            cli::returns::run(&config.portfolios, &resolver, from, to).await
        }
    }
}
