//! Yahoo Finance chart API client
//!
//! Public, unauthenticated price-history endpoint. Requests are spaced by a
//! configurable delay so a universe run does not trip the provider's limits.

use crate::api::error::DataError;
use crate::api::provider::{BarWindow, MarketDataProvider};
use crate::config::ProviderConfig;
use crate::data::{normalize, provider_ticker, BarSeries, Candle, Interval};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl Quote {
    /// Candle at row `i`, or `None` if any field is missing
    fn candle(&self, i: usize, ts: i64) -> Option<Candle> {
        let field = |col: &[Option<f64>]| -> Option<Decimal> {
            let value = (*col.get(i)?)?;
            if !value.is_finite() {
                return None;
            }
            Decimal::try_from(value).ok()
        };

        Some(Candle {
            timestamp: Utc.timestamp_opt(ts, 0).single()?,
            open: field(&self.open)?,
            high: field(&self.high)?,
            low: field(&self.low)?,
            close: field(&self.close)?,
            volume: field(&self.volume)?,
        })
    }
}

/// Parse a chart response body into a bar series, dropping incomplete rows
pub fn parse_chart(symbol: &str, interval: Interval, body: &str) -> Result<BarSeries, DataError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        return Err(DataError::Provider {
            symbol: symbol.to_string(),
            code: error.code,
            description: error.description,
        });
    }

    let result = response
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
        .ok_or_else(|| DataError::NoData(symbol.to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let candles: Vec<Candle> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| quote.candle(i, ts))
        .collect();

    if candles.is_empty() {
        return Err(DataError::NoData(symbol.to_string()));
    }

    Ok(BarSeries::new(symbol, interval, candles))
}

pub struct YahooClient {
    client: Client,
    base_url: String,
    request_delay: Duration,
    last_request: Mutex<Instant>,
}

impl YahooClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        let request_delay = Duration::from_millis(config.request_delay_ms);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_delay,
            last_request: Mutex::new(
                Instant::now()
                    .checked_sub(request_delay)
                    .unwrap_or_else(Instant::now),
            ),
        })
    }

    /// Wait for rate limiting if necessary
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.request_delay {
            tokio::time::sleep(self.request_delay - elapsed).await;
        }
        *last = Instant::now();
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            ticker.replace('^', "%5E")
        )
    }

    fn query_params(interval: Interval, window: &BarWindow) -> Vec<(&'static str, String)> {
        let mut params = vec![("interval", interval.as_str().to_string())];
        match window {
            BarWindow::Range(range) => params.push(("range", range.clone())),
            BarWindow::Dates { start, end } => {
                let start_ts = start.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp());
                let end_ts = end.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp());
                params.push(("period1", start_ts.unwrap_or_default().to_string()));
                params.push(("period2", end_ts.unwrap_or_default().to_string()));
            }
        }
        params
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        window: &BarWindow,
    ) -> Result<BarSeries> {
        self.rate_limit().await;

        let symbol = normalize(symbol);
        let ticker = provider_ticker(&symbol);
        let url = self.chart_url(&ticker);

        debug!("Fetching bars: {} ({}) interval={} window={:?}", symbol, ticker, interval, window);

        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(interval, window))
            .send()
            .await
            .map_err(DataError::from)?;

        // Error bodies carry a chart.error payload, so parse before checking status
        let status = response.status();
        let body = response.text().await.map_err(DataError::from)?;

        match parse_chart(&symbol, interval, &body) {
            Ok(series) => {
                debug!("Fetched {} bars for {}", series.len(), symbol);
                Ok(series)
            }
            Err(DataError::Parse(_)) if !status.is_success() => Err(DataError::Provider {
                symbol,
                code: status.as_u16().to_string(),
                description: status.canonical_reason().unwrap_or("HTTP error").to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "INR", "symbol": "RELIANCE.NS"},
                "timestamp": [1704167100, 1704253500, 1704339900],
                "indicators": {
                    "quote": [{
                        "open": [2600.5, null, 2610.0],
                        "high": [2620.0, 2615.0, 2640.25],
                        "low": [2590.0, 2595.0, 2605.0],
                        "close": [2615.0, 2600.0, 2633.5],
                        "volume": [5120300, 4800000, 6100200]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_drops_incomplete_rows() {
        let series = parse_chart("RELIANCE", Interval::Daily, CHART).unwrap();
        assert_eq!(series.symbol, "RELIANCE");
        assert_eq!(series.len(), 2);
        assert_eq!(series.candles[0].open, dec!(2600.5));
        assert_eq!(series.candles[1].high, dec!(2640.25));
        assert_eq!(series.candles[1].volume, dec!(6100200));
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart("XYZ", Interval::Daily, body) {
            Err(DataError::Provider { code, .. }) => assert_eq!(code, "Not Found"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_chart_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(
            parse_chart("XYZ", Interval::Daily, body),
            Err(DataError::NoData(_))
        ));
        assert!(matches!(
            parse_chart("XYZ", Interval::Daily, "<html>"),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_query_params() {
        let params = YahooClient::query_params(Interval::FiveMinutes, &BarWindow::Range("1d".into()));
        assert_eq!(params, vec![("interval", "5m".to_string()), ("range", "1d".to_string())]);

        let window = BarWindow::Dates {
            start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        let params = YahooClient::query_params(Interval::Daily, &window);
        assert_eq!(params[1], ("period1", "1704067200".to_string()));
        assert_eq!(params[2], ("period2", "1704153600".to_string()));
    }

    #[test]
    fn test_chart_url_encodes_index() {
        let client = YahooClient::new(&ProviderConfig::default()).unwrap();
        assert!(client.chart_url("^NSEI").ends_with("/v8/finance/chart/%5ENSEI"));
    }
}
