//! Quandl-style live price source.
//!
//! Fetches one ticker's dataset from the v3 datasets JSON API and extracts
//! the adjusted-close column. The API key is injected at construction —
//! there is no process-wide configuration. Fetches are single-shot: a
//! failed request is reported to the caller, never retried here.

use super::provider::{FetchError, PriceSource, RawSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.quandl.com/api/v3/datasets";
const DEFAULT_DATABASE: &str = "WIKI";
const DATE_COLUMN: &str = "Date";
const PRICE_COLUMN: &str = "Adj. Close";

/// Datasets API response envelope.
#[derive(Debug, Deserialize)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    column_names: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

/// Live source backed by a Quandl-compatible datasets API.
pub struct QuandlSource {
    client: reqwest::blocking::Client,
    base_url: String,
    database: String,
    api_key: String,
}

impl QuandlSource {
    /// Source against the public API with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_DATABASE, api_key)
    }

    /// Source against an arbitrary base URL and database code.
    pub fn with_base_url(
        base_url: impl Into<String>,
        database: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            database: database.into(),
            api_key: api_key.into(),
        }
    }

    fn dataset_url(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> String {
        let mut url = format!(
            "{}/{}/{}.json?api_key={}",
            self.base_url, self.database, ticker, self.api_key
        );
        if let Some(start) = start {
            url.push_str(&format!("&start_date={start}"));
        }
        if let Some(end) = end {
            url.push_str(&format!("&end_date={end}"));
        }
        url
    }

    /// Extract the date and adjusted-close columns into a sorted series.
    fn parse_response(ticker: &str, resp: DatasetResponse) -> Result<RawSeries, FetchError> {
        let dataset = resp.dataset;

        let date_idx = column_index(&dataset.column_names, DATE_COLUMN, ticker)?;
        let price_idx = column_index(&dataset.column_names, PRICE_COLUMN, ticker)?;

        let mut observations: Vec<(NaiveDate, f64)> = Vec::with_capacity(dataset.data.len());
        for row in &dataset.data {
            let raw_date = row.get(date_idx).and_then(|v| v.as_str()).ok_or_else(|| {
                FetchError::ResponseFormatChanged(format!("non-string date in {ticker} row"))
            })?;
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
                FetchError::ResponseFormatChanged(format!("bad date '{raw_date}' for {ticker}: {e}"))
            })?;
            // Null prices become NaN; the cleaner deals with them downstream.
            let value = row
                .get(price_idx)
                .and_then(|v| v.as_f64())
                .unwrap_or(f64::NAN);
            observations.push((date, value));
        }

        if observations.is_empty() {
            return Err(FetchError::TickerNotFound {
                ticker: ticker.to_string(),
            });
        }

        // The API serves newest-first by default.
        observations.sort_by_key(|(date, _)| *date);

        let (dates, values) = observations.into_iter().unzip();
        Ok(RawSeries { dates, values })
    }
}

fn column_index(names: &[String], wanted: &str, ticker: &str) -> Result<usize, FetchError> {
    names.iter().position(|n| n == wanted).ok_or_else(|| {
        FetchError::ResponseFormatChanged(format!("no '{wanted}' column in {ticker} dataset"))
    })
}

impl PriceSource for QuandlSource {
    fn name(&self) -> &str {
        "quandl"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RawSeries, FetchError> {
        let url = self.dataset_url(ticker, start, end);

        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                FetchError::NetworkUnreachable(e.to_string())
            } else {
                FetchError::Other(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::TickerNotFound {
                ticker: ticker.to_string(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::AuthenticationRejected(format!(
                "HTTP {status} for {ticker}"
            )));
        }
        if !status.is_success() {
            return Err(FetchError::Other(format!("HTTP {status} for {ticker}")));
        }

        let payload: DatasetResponse = resp.json().map_err(|e| {
            FetchError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;

        Self::parse_response(ticker, payload)
    }
}
