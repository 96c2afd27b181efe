//! Daily price series from an Alpha Vantage style quote API.
//!
//! Stocks use `TIME_SERIES_DAILY`, cryptocurrencies `DIGITAL_CURRENCY_DAILY` against USD.
//! Responses map ISO dates to objects of prefixed field names ("4. close",
//! "4a. close (USD)") holding stringified numbers.

use crate::core::config::AlphaVantageConfig;
use crate::core::error::PriceError;
use crate::core::price::{AssetClass, DailyRecord, FetchRequest, PriceSource, TimeSeries};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const STOCK_SERIES_KEY: &str = "Time Series (Daily)";
const CRYPTO_SERIES_KEY: &str = "Time Series (Digital Currency Daily)";

pub struct AlphaVantageSource {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AlphaVantageSource {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pricefolio/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Builds a source from configuration, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &AlphaVantageConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!(
                "Environment variable {} must hold the Alpha Vantage API key",
                config.api_key_env
            )
        })?;
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Masks the API key, which travels as a query parameter and ends up in request errors.
    fn redact(&self, message: &str) -> String {
        if self.api_key.is_empty() {
            return message.to_string();
        }
        message.replace(&self.api_key, "***")
    }

    fn query_params<'a>(&'a self, request: &'a FetchRequest) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("function", function_name(request.key.asset_class))];
        params.push(("symbol", request.key.symbol.as_str()));
        if request.key.asset_class == AssetClass::Crypto {
            params.push(("market", "USD"));
        }
        params.push(("outputsize", request.window.as_param()));
        params.push(("apikey", self.api_key.as_str()));
        params
    }
}

fn function_name(asset_class: AssetClass) -> &'static str {
    match asset_class {
        AssetClass::Stock => "TIME_SERIES_DAILY",
        AssetClass::Crypto => "DIGITAL_CURRENCY_DAILY",
    }
}

fn series_key(asset_class: AssetClass) -> &'static str {
    match asset_class {
        AssetClass::Stock => STOCK_SERIES_KEY,
        AssetClass::Crypto => CRYPTO_SERIES_KEY,
    }
}

fn is_rate_limit_notice(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("rate limit") || message.contains("requests per day")
}

/// Parses a daily-series payload, classifying provider error and quota notices.
pub fn parse_payload(
    body: &str,
    asset_class: AssetClass,
    symbol: &str,
) -> Result<TimeSeries, PriceError> {
    let payload: Map<String, Value> = serde_json::from_str(body).map_err(|e| {
        PriceError::Transport(format!("Failed to parse JSON response for {symbol}: {e}"))
    })?;

    if let Some(message) = payload.get("Error Message") {
        return Err(PriceError::Provider(format!("{symbol}: {}", text(message))));
    }
    if let Some(note) = payload.get("Note") {
        return Err(PriceError::QuotaExceeded(text(note)));
    }
    if let Some(info) = payload.get("Information") {
        let info = text(info);
        if is_rate_limit_notice(&info) {
            return Err(PriceError::QuotaExceeded(info));
        }
        if !payload.contains_key(series_key(asset_class)) {
            return Err(PriceError::Provider(format!("{symbol}: {info}")));
        }
    }

    let days = payload
        .get(series_key(asset_class))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            PriceError::Provider(format!(
                "No '{}' in response for {symbol}",
                series_key(asset_class)
            ))
        })?;

    days.iter()
        .map(|(date, values)| -> Result<(NaiveDate, DailyRecord), PriceError> {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                PriceError::Provider(format!("Invalid date '{date}' for {symbol}: {e}"))
            })?;
            Ok((date, parse_record(values, symbol, date)?))
        })
        .collect()
}

fn parse_record(values: &Value, symbol: &str, date: NaiveDate) -> Result<DailyRecord, PriceError> {
    let fields = values.as_object().ok_or_else(|| {
        PriceError::Provider(format!("Record for {symbol} on {date} is not an object"))
    })?;

    let mut record = DailyRecord::new();
    for (name, value) in fields {
        let number = match value {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            PriceError::Provider(format!(
                "Invalid value {value} for '{name}' of {symbol} on {date}"
            ))
        })?;
        record.insert(name.as_str(), number);
    }
    Ok(record)
}

fn text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[async_trait]
impl PriceSource for AlphaVantageSource {
    #[instrument(
        name = "AlphaVantageFetch",
        skip(self, request),
        fields(key = %request.key, window = %request.window)
    )]
    async fn fetch(&self, request: &FetchRequest) -> Result<TimeSeries, PriceError> {
        let symbol = request.key.symbol.as_str();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/query", self.base_url),
            &self.query_params(request),
        )
        .map_err(|e| PriceError::InvalidInput(format!("Invalid provider URL: {e}")))?;
        debug!(
            function = function_name(request.key.asset_class),
            symbol, "Requesting daily series"
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceError::Transport(format!("Request timed out for symbol: {symbol}"))
            } else {
                PriceError::Transport(format!(
                    "Request error: {} for symbol: {symbol}",
                    self.redact(&e.to_string())
                ))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Transport(format!(
                "HTTP error: {status} for symbol: {symbol}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            PriceError::Transport(format!(
                "Failed to read response for {symbol}: {}",
                self.redact(&e.to_string())
            ))
        })?;

        let series = parse_payload(&body, request.key.asset_class, symbol)?;
        debug!(records = series.len(), range = %series.range_label(), "Parsed daily series");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::{PriceField, SeriesKey, WindowSize};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STOCK_RESPONSE: &str = r#"{
        "Meta Data": {
            "1. Information": "Daily Prices (open, high, low, close) and Volumes",
            "2. Symbol": "AAPL"
        },
        "Time Series (Daily)": {
            "2024-06-28": {
                "1. open": "215.7700",
                "2. high": "216.0700",
                "3. low": "210.3000",
                "4. close": "210.6200",
                "5. volume": "82542718"
            },
            "2024-06-27": {
                "1. open": "214.6900",
                "2. high": "215.7395",
                "3. low": "212.3500",
                "4. close": "214.1000",
                "5. volume": "49772707"
            }
        }
    }"#;

    const CRYPTO_RESPONSE: &str = r#"{
        "Time Series (Digital Currency Daily)": {
            "2024-06-30": {
                "1a. open (USD)": "3380.10",
                "2a. high (USD)": "3440.00",
                "3a. low (USD)": "3362.00",
                "4a. close (USD)": "3433.80",
                "4b. close (USD)": "3433.80",
                "5. volume": "120000.5",
                "6. market cap (USD)": "412000000000"
            }
        }
    }"#;

    fn request(symbol: &str, asset_class: AssetClass, window: WindowSize) -> FetchRequest {
        FetchRequest {
            key: SeriesKey::new(symbol, asset_class),
            window,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    async fn mount(server: &MockServer, function: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn source(server: &MockServer) -> AlphaVantageSource {
        AlphaVantageSource::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_stock_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "TIME_SERIES_DAILY"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("outputsize", "compact"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STOCK_RESPONSE))
            .mount(&mock_server)
            .await;

        let series = source(&mock_server)
            .fetch(&request("AAPL", AssetClass::Stock, WindowSize::Compact))
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        let day = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        assert_eq!(series.latest_date(), Some(day));
        let record = series.get(&day).unwrap();
        assert_eq!(record.field(PriceField::Close), Some(210.62));
        assert_eq!(record.field(PriceField::Volume), Some(82542718.0));
    }

    #[tokio::test]
    async fn test_successful_crypto_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "DIGITAL_CURRENCY_DAILY"))
            .and(query_param("market", "USD"))
            .and(query_param("outputsize", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CRYPTO_RESPONSE))
            .mount(&mock_server)
            .await;

        let series = source(&mock_server)
            .fetch(&request("ETH", AssetClass::Crypto, WindowSize::Full))
            .await
            .unwrap();

        let record = series
            .get(&NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
            .unwrap();
        assert_eq!(record.field(PriceField::Close), Some(3433.8));
        assert_eq!(record.field(PriceField::MarketCap), Some(412000000000.0));
    }

    #[tokio::test]
    async fn test_error_message_is_provider_error() {
        let mock_server = MockServer::start().await;
        let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
        mount(
            &mock_server,
            "TIME_SERIES_DAILY",
            ResponseTemplate::new(200).set_body_string(body),
        )
        .await;

        let result = source(&mock_server)
            .fetch(&request("NOPE", AssetClass::Stock, WindowSize::Compact))
            .await;
        assert!(matches!(result, Err(PriceError::Provider(msg)) if msg.starts_with("NOPE: Invalid API call")));
    }

    #[tokio::test]
    async fn test_note_is_quota_exceeded() {
        let mock_server = MockServer::start().await;
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        mount(
            &mock_server,
            "TIME_SERIES_DAILY",
            ResponseTemplate::new(200).set_body_string(body),
        )
        .await;

        let err = source(&mock_server)
            .fetch(&request("AAPL", AssetClass::Stock, WindowSize::Compact))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "TIME_SERIES_DAILY", ResponseTemplate::new(500)).await;

        let result = source(&mock_server)
            .fetch(&request("AAPL", AssetClass::Stock, WindowSize::Compact))
            .await;
        assert_eq!(
            result.unwrap_err(),
            PriceError::Transport(
                "HTTP error: 500 Internal Server Error for symbol: AAPL".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_timeout_is_transport() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "TIME_SERIES_DAILY",
            ResponseTemplate::new(200)
                .set_body_string(STOCK_RESPONSE)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let source =
            AlphaVantageSource::new(&mock_server.uri(), "test-key", Duration::from_millis(50))
                .unwrap();
        let result = source
            .fetch(&request("AAPL", AssetClass::Stock, WindowSize::Compact))
            .await;
        assert!(matches!(result, Err(PriceError::Transport(_))));
    }

    #[tokio::test]
    async fn test_connection_error_hides_api_key() {
        // bind then drop to get a local port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let source = AlphaVantageSource::new(
            &format!("http://{address}"),
            "SECRET-KEY-123",
            Duration::from_secs(5),
        )
        .unwrap();
        let err = source
            .fetch(&request("AAPL", AssetClass::Stock, WindowSize::Compact))
            .await
            .unwrap_err();

        assert!(matches!(err, PriceError::Transport(_)));
        let message = err.to_string();
        assert!(!message.contains("SECRET-KEY-123"), "key leaked: {message}");
        assert!(message.contains("AAPL"));
    }

    #[test]
    fn test_redact_masks_key() {
        let source =
            AlphaVantageSource::new("http://localhost", "abc123", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.redact("url (http://localhost/query?apikey=abc123)"),
            "url (http://localhost/query?apikey=***)"
        );

        let keyless = AlphaVantageSource::new("http://localhost", "", Duration::from_secs(1)).unwrap();
        assert_eq!(keyless.redact("plain"), "plain");
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        for value in ["NaN", "inf", "-infinity"] {
            let body = format!(r#"{{"Time Series (Daily)": {{"2024-06-28": {{"4. close": "{value}"}}}}}}"#);
            assert!(
                matches!(
                    parse_payload(&body, AssetClass::Stock, "AAPL"),
                    Err(PriceError::Provider(_))
                ),
                "{value} accepted"
            );
        }
    }

    #[test]
    fn test_parse_payload_classification() {
        let malformed = parse_payload("<html>busy</html>", AssetClass::Stock, "AAPL");
        assert!(matches!(malformed, Err(PriceError::Transport(_))));

        let info = r#"{"Information": "We have detected your API key as ABC and our standard API rate limit is 25 requests per day."}"#;
        assert!(matches!(
            parse_payload(info, AssetClass::Stock, "AAPL"),
            Err(PriceError::QuotaExceeded(_))
        ));

        let premium = r#"{"Information": "This is a premium endpoint."}"#;
        assert!(matches!(
            parse_payload(premium, AssetClass::Stock, "AAPL"),
            Err(PriceError::Provider(_))
        ));

        // a stock payload read as crypto has no matching series
        assert!(matches!(
            parse_payload(STOCK_RESPONSE, AssetClass::Crypto, "AAPL"),
            Err(PriceError::Provider(_))
        ));

        let bad_number = r#"{"Time Series (Daily)": {"2024-06-28": {"4. close": "n/a"}}}"#;
        assert!(matches!(
            parse_payload(bad_number, AssetClass::Stock, "AAPL"),
            Err(PriceError::Provider(_))
        ));
    }

    #[test]
    fn test_parse_payload_keeps_field_order() {
        let series = parse_payload(CRYPTO_RESPONSE, AssetClass::Crypto, "ETH").unwrap();
        let (_, record) = series.iter().next().unwrap();
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec![
                "1a. open (USD)",
                "2a. high (USD)",
                "3a. low (USD)",
                "4a. close (USD)",
                "4b. close (USD)",
                "5. volume",
                "6. market cap (USD)",
            ]
        );
    }
}
