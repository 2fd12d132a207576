use std::collections::BTreeMap;

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::StockError;

/// Date (`YYYY-MM-DD`) to the provider's raw daily record.
pub type TimeSeries = BTreeMap<String, DailyBar>;

#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: String,
    api_key: String,
}

impl PriceClient {
    pub fn new(
        base_api: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StockError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch the daily series for `symbol`.
    /// Fails on a non-success status or when the body carries no series.
    pub async fn fetch_daily(&self, symbol: &str) -> Result<TimeSeries, StockError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(StockError::InvalidInput("symbol is empty".to_string()));
        }

        debug!(base = %self.base_api, symbol, "requesting daily series");

        let body = self
            .daily_request(symbol)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_daily(&body)
    }

    fn daily_request(&self, symbol: &str) -> RequestBuilder {
        let url = format!("{}/query", self.base_api.trim_end_matches('/'));

        self.client.get(url).query(&[
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ])
    }
}

/// Decode a `TIME_SERIES_DAILY` body.
///
/// Alpha Vantage answers problems with HTTP 200 and a message object in
/// place of the series, so those are mapped to [`StockError::Provider`].
pub fn parse_daily(body: &str) -> Result<TimeSeries, StockError> {
    let res: DailyResponse = serde_json::from_str(body)?;

    if let Some(series) = res.series {
        return Ok(series);
    }

    match res.error_message.or(res.note).or(res.information) {
        Some(msg) => Err(StockError::Provider(msg)),
        None => Err(StockError::DataFormat(
            "missing `Time Series (Daily)` in response".to_string(),
        )),
    }
}

//
// Match Alpha Vantage JSON
// https://www.alphavantage.co/documentation/#daily
//
#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<TimeSeries>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,

    #[serde(rename = "Note")]
    note: Option<String>,

    #[serde(rename = "Information")]
    information: Option<String>,
}

/// One day of prices, kept as the provider's strings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DailyBar {
    #[serde(rename = "1. open", default)]
    pub open: Option<String>,

    #[serde(rename = "2. high", default)]
    pub high: Option<String>,

    #[serde(rename = "3. low", default)]
    pub low: Option<String>,

    #[serde(rename = "4. close", default)]
    pub close: Option<String>,

    #[serde(rename = "5. volume", default)]
    pub volume: Option<String>,
}

impl DailyBar {
    /// Closing price as a number.
    pub fn close(&self) -> Result<f64, StockError> {
        let raw = self
            .close
            .as_deref()
            .ok_or_else(|| StockError::DataFormat("missing `4. close`".to_string()))?;

        raw.trim()
            .parse::<f64>()
            .map_err(|_| StockError::DataFormat(format!("non-numeric close: {raw:?}")))
    }
}
