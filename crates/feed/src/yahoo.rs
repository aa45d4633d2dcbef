use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use common::{Bar, DataProvider, Error, Result};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Daily bars from the Yahoo Finance v8 chart API.
#[derive(Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new() -> Result<Self> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| Error::Config(format!("invalid Yahoo base URL: {e}")))?;
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url> {
        self.base_url
            .join(&format!("v8/finance/chart/{symbol}"))
            .map_err(|e| Error::Config(format!("invalid chart URL for {symbol}: {e}")))
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>> {
        // Weekends and holidays: ask for roughly 1.5x the calendar span.
        let end = Utc::now();
        let start = end - chrono::Duration::days((lookback as i64 * 3 / 2) + 10);

        let resp = self
            .client
            .get(self.chart_url(symbol)?)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{symbol}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::DataUnavailable(format!("{symbol}: HTTP {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{symbol}: {e}")))?;

        let mut bars = parse_chart(symbol, &body)?;
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        debug!(symbol = %symbol, bars = bars.len(), "Fetched daily bars");
        Ok(bars)
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Parse a chart response into bars, oldest first. Rows with any missing
/// field are skipped; an empty result is `DataUnavailable`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Bar>> {
    let unavailable = |reason: String| Error::DataUnavailable(format!("{symbol}: {reason}"));

    let resp: ChartResponse =
        serde_json::from_str(body).map_err(|e| unavailable(format!("malformed chart response: {e}")))?;
    if let Some(err) = resp.chart.error {
        return Err(unavailable(err.description));
    }
    let result = resp
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| unavailable("no chart data".into()))?;
    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| unavailable("no quote data".into()))?;

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |series: &[Option<f64>]| series.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            field(&quote.volume),
        ) else {
            continue;
        };
        let Some(time) = Utc.timestamp_opt(ts, 0).single() else {
            continue;
        };
        bars.push(Bar { time, open, high, low, close, volume });
    }
    bars.sort_by_key(|b| b.time);
    bars.dedup_by_key(|b| b.time);

    if bars.is_empty() {
        return Err(unavailable("no bars returned".into()));
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL"},
                "timestamp": [1714397400, 1714483800, 1714570200],
                "indicators": {
                    "quote": [{
                        "open":   [173.37, null, 169.58],
                        "high":   [176.03, 174.99, 172.71],
                        "low":    [173.10, 170.00, 169.11],
                        "close":  [173.50, 170.33, 169.30],
                        "volume": [68169400, 65934800, 50383100]
                    }],
                    "adjclose": [{"adjclose": [173.26, 170.10, 169.07]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn rows_with_gaps_are_skipped() {
        let bars = parse_chart("AAPL", CHART).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 173.50);
        assert_eq!(bars[1].close, 169.30);
        assert!(bars[0].time < bars[1].time);
    }

    #[test]
    fn chart_error_is_data_unavailable() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("ZZZZ", body).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(ref m) if m.contains("delisted")), "{err}");
    }

    #[test]
    fn empty_or_garbage_body_is_data_unavailable() {
        let empty = r#"{"chart": {"result": [{"timestamp": [], "indicators": {"quote": [{"open": [], "high": [], "low": [], "close": [], "volume": []}]}}], "error": null}}"#;
        assert!(matches!(parse_chart("AAPL", empty), Err(Error::DataUnavailable(_))));
        assert!(matches!(parse_chart("AAPL", "<html>"), Err(Error::DataUnavailable(_))));
    }

    #[test]
    fn chart_url_includes_symbol() {
        let provider = YahooProvider::new().unwrap();
        assert_eq!(
            provider.chart_url("MSFT").unwrap().as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/MSFT"
        );
    }
}
