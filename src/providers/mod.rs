pub mod alphavantage;
pub mod synthetic;

use crate::core::config::{AppConfig, SourceKind};
use crate::core::price::PriceSource;
use alphavantage::AlphaVantageSource;
use anyhow::Result;
use std::sync::Arc;
use synthetic::SyntheticSource;
use tracing::debug;

/// Builds the price source selected in the configuration.
pub fn build_source(config: &AppConfig) -> Result<Arc<dyn PriceSource>> {
    match config.source {
        SourceKind::AlphaVantage => {
            let provider = &config.providers.alphavantage;
            debug!("Using Alpha Vantage source at {}", provider.base_url);
            Ok(Arc::new(AlphaVantageSource::from_config(provider)?))
        }
        SourceKind::Synthetic => {
            debug!("Using synthetic price source");
            Ok(Arc::new(SyntheticSource::new()))
        }
    }
}
