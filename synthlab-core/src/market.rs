//! Canonical price and return frames over an explicit data source.
//!
//! `MarketData` is a stateless request/response transform: each call fetches
//! or loads fresh data and produces a new frame. The caller selects the
//! source variant at construction — cache-backed requests are served from
//! the file as-is (no resampling), live requests are fetched per ticker,
//! aligned, and resampled.

use crate::data::cache::CsvCache;
use crate::data::provider::{PriceSource, RawSeries, WarningSink};
use crate::frame::{Frame, Frequency};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors surfaced by the market-data layer.
///
/// Per-ticker fetch failures never appear here — they are warned and
/// dropped. Only an unusable result set aborts the call.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("no usable market data: {0}")]
    DataUnavailable(String),
}

/// Parameters of one canonical-table request.
#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub tickers: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub freq: Frequency,
}

impl SeriesRequest {
    /// Unbounded business-daily request for the given tickers.
    pub fn new(tickers: Vec<String>) -> Self {
        Self {
            tickers,
            start: None,
            end: None,
            freq: Frequency::Business,
        }
    }
}

enum SourceKind {
    Live(Box<dyn PriceSource>),
    Cached(CsvCache),
}

/// Canonical price/return accessor over one explicitly selected source.
pub struct MarketData {
    source: SourceKind,
}

impl MarketData {
    /// Market data served by per-ticker live fetches.
    pub fn live(source: Box<dyn PriceSource>) -> Self {
        Self {
            source: SourceKind::Live(source),
        }
    }

    /// Market data served from a wide-CSV cache file.
    pub fn cached(cache: CsvCache) -> Self {
        Self {
            source: SourceKind::Cached(cache),
        }
    }

    /// Canonical price table for the request.
    ///
    /// Live: tickers that fail to fetch are warned and excluded; the
    /// available series are aligned on the union of their dates (NaN holes),
    /// sorted ascending, and resampled to `req.freq` by last observation.
    /// Cached: column intersection in the cache's native order, then
    /// inclusive date slicing — no resampling.
    pub fn prices(
        &self,
        req: &SeriesRequest,
        sink: &dyn WarningSink,
    ) -> Result<Frame, MarketError> {
        match &self.source {
            SourceKind::Cached(cache) => from_cache(cache, req),
            SourceKind::Live(source) => from_live(source.as_ref(), req, sink),
        }
    }

    /// Canonical return table for the request.
    ///
    /// Live: derived from `prices` by percentage change (one row shorter).
    /// Cached: the file already holds returns and is served directly — the
    /// table is NOT re-derived from prices.
    pub fn returns(
        &self,
        req: &SeriesRequest,
        sink: &dyn WarningSink,
    ) -> Result<Frame, MarketError> {
        match &self.source {
            SourceKind::Cached(cache) => from_cache(cache, req),
            SourceKind::Live(_) => Ok(self.prices(req, sink)?.pct_change()),
        }
    }
}

fn from_cache(cache: &CsvCache, req: &SeriesRequest) -> Result<Frame, MarketError> {
    let full = cache
        .load()
        .map_err(|e| MarketError::DataUnavailable(e.to_string()))?;

    let selected = full.select(&req.tickers);
    if selected.width() == 0 {
        return Err(MarketError::DataUnavailable(format!(
            "none of the requested tickers are present in {}",
            cache.path().display()
        )));
    }

    // An empty row range (start past the cached history) is a valid result.
    Ok(selected.slice_dates(req.start, req.end))
}

fn from_live(
    source: &dyn PriceSource,
    req: &SeriesRequest,
    sink: &dyn WarningSink,
) -> Result<Frame, MarketError> {
    let mut fetched: Vec<(String, RawSeries)> = Vec::new();
    for ticker in &req.tickers {
        // The ticker set is ordered and unique; repeats are a caller slip.
        if fetched.iter().any(|(t, _)| t == ticker) {
            continue;
        }
        match source.fetch(ticker, req.start, req.end) {
            Ok(series) => fetched.push((ticker.clone(), series)),
            Err(e) => sink.warn(&format!("failed to fetch market data for {ticker}: {e}")),
        }
    }

    if fetched.is_empty() {
        return Err(MarketError::DataUnavailable(format!(
            "no requested ticker could be fetched from {}",
            source.name()
        )));
    }

    Ok(assemble(fetched).resample_last(req.freq))
}

/// Union-of-dates alignment: every fetched ticker gets one value per date in
/// the union, NaN where it has no observation. Column order follows fetch
/// order (the requested order minus failures).
fn assemble(fetched: Vec<(String, RawSeries)>) -> Frame {
    let mut all_dates = BTreeSet::new();
    for (_, series) in &fetched {
        all_dates.extend(series.dates.iter().copied());
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut tickers = Vec::with_capacity(fetched.len());
    let mut columns = Vec::with_capacity(fetched.len());
    for (ticker, series) in fetched {
        let by_date: HashMap<NaiveDate, f64> = series
            .dates
            .iter()
            .copied()
            .zip(series.values.iter().copied())
            .collect();
        let column = dates
            .iter()
            .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
            .collect();
        tickers.push(ticker);
        columns.push(column);
    }

    Frame::from_raw_parts(dates, tickers, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{FetchError, SilentWarnings};
    use std::cell::RefCell;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// In-memory source: a fixed series per known ticker, errors otherwise.
    struct MapSource {
        series: HashMap<String, RawSeries>,
    }

    impl MapSource {
        fn new(entries: Vec<(&str, Vec<(&str, f64)>)>) -> Self {
            let mut series = HashMap::new();
            for (ticker, points) in entries {
                let (dates, values) = points
                    .into_iter()
                    .map(|(d, v)| (date(d), v))
                    .unzip();
                series.insert(ticker.to_string(), RawSeries { dates, values });
            }
            Self { series }
        }
    }

    impl PriceSource for MapSource {
        fn name(&self) -> &str {
            "map"
        }

        fn fetch(
            &self,
            ticker: &str,
            _start: Option<NaiveDate>,
            _end: Option<NaiveDate>,
        ) -> Result<RawSeries, FetchError> {
            self.series
                .get(ticker)
                .cloned()
                .ok_or_else(|| FetchError::TickerNotFound {
                    ticker: ticker.to_string(),
                })
        }
    }

    /// Records every warning for assertions.
    struct RecordingSink {
        messages: RefCell<Vec<String>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                messages: RefCell::new(Vec::new()),
            }
        }
    }

    impl WarningSink for RecordingSink {
        fn warn(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    fn two_ticker_source() -> MapSource {
        MapSource::new(vec![
            (
                "SPY",
                vec![
                    ("2024-01-02", 100.0),
                    ("2024-01-03", 102.0),
                    ("2024-01-04", 101.0),
                ],
            ),
            (
                "QQQ",
                vec![("2024-01-02", 200.0), ("2024-01-04", 202.0)],
            ),
        ])
    }

    #[test]
    fn live_prices_align_on_date_union_with_nan_holes() {
        let market = MarketData::live(Box::new(two_ticker_source()));
        let req = SeriesRequest::new(vec!["SPY".into(), "QQQ".into()]);

        let prices = market.prices(&req, &SilentWarnings).unwrap();

        assert_eq!(prices.height(), 3);
        assert_eq!(prices.tickers(), &["SPY".to_string(), "QQQ".to_string()]);
        let qqq = prices.column("QQQ").unwrap();
        assert_eq!(qqq[0], 200.0);
        assert!(qqq[1].is_nan());
        assert_eq!(qqq[2], 202.0);
    }

    #[test]
    fn failing_ticker_is_warned_and_dropped() {
        let market = MarketData::live(Box::new(two_ticker_source()));
        let req = SeriesRequest::new(vec!["SPY".into(), "MISSING".into()]);
        let sink = RecordingSink::new();

        let prices = market.prices(&req, &sink).unwrap();

        assert_eq!(prices.tickers(), &["SPY".to_string()]);
        let messages = sink.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("MISSING"));
    }

    #[test]
    fn all_tickers_failing_is_data_unavailable() {
        let market = MarketData::live(Box::new(two_ticker_source()));
        let req = SeriesRequest::new(vec!["FOO".into(), "BAR".into()]);

        let result = market.prices(&req, &SilentWarnings);
        assert!(matches!(result, Err(MarketError::DataUnavailable(_))));
    }

    #[test]
    fn live_returns_are_one_row_shorter_than_prices() {
        let market = MarketData::live(Box::new(two_ticker_source()));
        let req = SeriesRequest::new(vec!["SPY".into()]);

        let prices = market.prices(&req, &SilentWarnings).unwrap();
        let returns = market.returns(&req, &SilentWarnings).unwrap();

        assert_eq!(returns.height(), prices.height() - 1);
        assert_eq!(returns.tickers(), prices.tickers());
    }

    #[test]
    fn duplicate_request_tickers_yield_one_column() {
        let market = MarketData::live(Box::new(two_ticker_source()));
        let req = SeriesRequest::new(vec!["SPY".into(), "SPY".into()]);

        let prices = market.prices(&req, &SilentWarnings).unwrap();
        assert_eq!(prices.tickers(), &["SPY".to_string()]);
    }

    #[test]
    fn live_prices_resample_weekly() {
        let market = MarketData::live(Box::new(MapSource::new(vec![(
            "SPY",
            vec![
                ("2024-01-02", 100.0),
                ("2024-01-05", 103.0),
                ("2024-01-09", 104.0),
            ],
        )])));
        let mut req = SeriesRequest::new(vec!["SPY".into()]);
        req.freq = Frequency::Weekly;

        let prices = market.prices(&req, &SilentWarnings).unwrap();

        assert_eq!(prices.height(), 2);
        assert_eq!(prices.column("SPY").unwrap(), &[103.0, 104.0]);
    }
}
