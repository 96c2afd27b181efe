use crate::core::price::{AssetClass, PriceField, PriceQuery, SeriesKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tradeable asset. Stocks and cryptocurrencies differ only in their asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub symbol: String,
    #[serde(rename = "kind")]
    pub asset_class: AssetClass,
}

impl Instrument {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            asset_class,
        }
    }

    pub fn stock(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(name, symbol, AssetClass::Stock)
    }

    pub fn crypto(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(name, symbol, AssetClass::Crypto)
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.symbol.clone(), self.asset_class)
    }

    pub fn price_query(&self, date: Option<NaiveDate>, field: PriceField) -> PriceQuery {
        PriceQuery::new(self.key(), date, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_deserialization() {
        let yaml = r#"
name: "Ethereum"
symbol: "ETH"
kind: crypto
"#;
        let instrument: Instrument = serde_yaml::from_str(yaml).expect("Failed to deserialize");
        assert_eq!(instrument, Instrument::crypto("Ethereum", "ETH"));
        assert_eq!(instrument.key().to_string(), "crypto:ETH");
    }

    #[test]
    fn test_price_query_uses_instrument_key() {
        let apple = Instrument::stock("Apple", "AAPL");
        let date = NaiveDate::from_ymd_opt(2022, 4, 12);
        let query = apple.price_query(date, PriceField::Close);

        assert_eq!(query.key, SeriesKey::new("AAPL", AssetClass::Stock));
        assert_eq!(query.date, date);
        assert_eq!(query.field, PriceField::Close);
    }
}
