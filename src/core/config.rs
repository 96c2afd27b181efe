use crate::core::instrument::Instrument;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Portfolio {
    pub name: String,
    #[serde(default)]
    pub actives: Vec<Instrument>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "ALPHAVANTAGE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        AlphaVantageConfig {
            base_url: "https://www.alphavantage.co".to_string(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub alphavantage: AlphaVantageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    AlphaVantage,
    Synthetic,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Disk,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheBackend,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "pricefolio", "pricefolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "pricefolio", "pricefolio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::AssetClass;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
portfolios:
  - name: "Risky Steve"
    actives:
      - name: "Apple"
        symbol: "AAPL"
        kind: stock
      - name: "Ethereum"
        symbol: "ETH"
        kind: crypto
  - name: "Empty"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.portfolios.len(), 2);
        assert_eq!(config.portfolios[0].name, "Risky Steve");
        assert_eq!(config.portfolios[0].actives.len(), 2);
        assert_eq!(config.portfolios[0].actives[0].symbol, "AAPL");
        assert_eq!(config.portfolios[0].actives[1].asset_class, AssetClass::Crypto);
        assert!(config.portfolios[1].actives.is_empty());

        assert_eq!(config.source, SourceKind::AlphaVantage);
        assert_eq!(config.cache, CacheBackend::Disk);
        assert_eq!(
            config.providers.alphavantage.base_url,
            "https://www.alphavantage.co"
        );
        assert_eq!(config.providers.alphavantage.api_key_env, "ALPHAVANTAGE_API_KEY");
        assert_eq!(config.providers.alphavantage.timeout_secs, 30);

        let yaml_str_with_providers = r#"
portfolios: []
source: synthetic
cache: memory
providers:
  alphavantage:
    base_url: "http://example.com/av"
    api_key_env: "MY_AV_KEY"
data_path: "/tmp/pricefolio"
        "#;
        let config: AppConfig = serde_yaml::from_str(yaml_str_with_providers).unwrap();
        assert_eq!(config.source, SourceKind::Synthetic);
        assert_eq!(config.cache, CacheBackend::Memory);
        assert_eq!(config.providers.alphavantage.base_url, "http://example.com/av");
        assert_eq!(config.providers.alphavantage.api_key_env, "MY_AV_KEY");
        assert_eq!(config.providers.alphavantage.timeout_secs, 30);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/pricefolio")
        );
    }
}
