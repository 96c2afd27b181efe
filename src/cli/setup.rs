use super::ui;
use crate::core::config::{AppConfig, SourceKind};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example portfolios to the platform config directory and tells the user
/// what is still missing before prices can be fetched.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(&path)?;
    println!("Wrote example configuration to {}", path.display());

    let config: AppConfig =
        serde_yaml::from_str(EXAMPLE_CONFIG).context("Example configuration is not valid")?;
    if let Some(hint) = api_key_hint(&config) {
        println!("{}", ui::style_text(&hint, ui::StyleType::Warning));
    }
    Ok(())
}

/// Refuses to replace an existing file.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    info!(path = %path.display(), "Created example configuration");
    Ok(())
}

fn api_key_hint(config: &AppConfig) -> Option<String> {
    let env = &config.providers.alphavantage.api_key_env;
    match config.source {
        SourceKind::AlphaVantage if std::env::var_os(env).is_none() => Some(format!(
            "Export {env} with your Alpha Vantage API key, or set `source: synthetic` to try offline."
        )),
        _ => None,
    }
}
