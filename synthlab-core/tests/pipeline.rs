//! End-to-end pipeline tests: source → market data → synthetic series,
//! over both the cached and the live path.

use chrono::NaiveDate;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use synthlab_core::data::{
    CsvCache, FetchError, PriceSource, RawSeries, SilentWarnings,
};
use synthlab_core::market::{MarketData, MarketError, SeriesRequest};
use synthlab_core::synthetic::SyntheticReturns;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn temp_csv(contents: &str) -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = env::temp_dir().join(format!("synthlab_pipeline_{}_{id}.csv", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

fn request(tickers: &[&str]) -> SeriesRequest {
    SeriesRequest::new(tickers.iter().map(|t| t.to_string()).collect())
}

/// Deterministic price source with per-ticker drift patterns; unknown
/// tickers fail.
struct SyntheticSource {
    tickers: Vec<String>,
    days: usize,
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        ticker: &str,
        _start: Option<NaiveDate>,
        _end: Option<NaiveDate>,
    ) -> Result<RawSeries, FetchError> {
        let offset = self
            .tickers
            .iter()
            .position(|t| t == ticker)
            .ok_or_else(|| FetchError::TickerNotFound {
                ticker: ticker.to_string(),
            })?;

        let start = date("2019-01-01");
        let mut price = 50.0 * (offset + 1) as f64;
        let mut dates = Vec::with_capacity(self.days);
        let mut values = Vec::with_capacity(self.days);
        for i in 0..self.days {
            // Two incommensurate patterns, fixed per (ticker, day).
            let wobble = (((i * 31 + offset * 17) % 13) as f64 - 6.0) / 300.0
                + (((i * 7 + offset * 5) % 11) as f64 - 5.0) / 400.0;
            price *= 1.0 + wobble;
            dates.push(start + chrono::Duration::days(i as i64));
            values.push(price);
        }
        Ok(RawSeries { dates, values })
    }
}

// ── Cached path ──────────────────────────────────────────────────────

#[test]
fn cache_request_keeps_only_available_tickers() {
    let path = temp_csv(
        "Date,A,C\n\
         2024-01-02,0.01,0.02\n\
         2024-01-03,-0.01,0.005\n",
    );
    let market = MarketData::cached(CsvCache::new(&path));
    let frame = market
        .returns(&request(&["A", "B", "C"]), &SilentWarnings)
        .unwrap();

    // B is dropped silently; no error, no fabricated column.
    assert_eq!(frame.tickers(), &["A".to_string(), "C".to_string()]);
    assert_eq!(frame.height(), 2);

    let _ = fs::remove_file(&path);
}

#[test]
fn cache_request_with_no_known_ticker_is_data_unavailable() {
    let path = temp_csv("Date,A\n2024-01-02,0.01\n");
    let market = MarketData::cached(CsvCache::new(&path));

    let result = market.returns(&request(&["X", "Y"]), &SilentWarnings);
    assert!(matches!(result, Err(MarketError::DataUnavailable(_))));

    let _ = fs::remove_file(&path);
}

#[test]
fn cache_start_past_last_date_is_empty_not_an_error() {
    let path = temp_csv(
        "Date,A\n\
         2024-01-02,0.01\n\
         2024-01-03,0.02\n",
    );
    let market = MarketData::cached(CsvCache::new(&path));

    let mut req = request(&["A"]);
    req.start = Some(date("2024-06-01"));
    let frame = market.returns(&req, &SilentWarnings).unwrap();

    assert_eq!(frame.height(), 0);
    assert_eq!(frame.width(), 1);

    let _ = fs::remove_file(&path);
}

#[test]
fn cached_returns_are_served_as_stored_not_rederived() {
    // The file holds returns; the values must come back verbatim.
    let path = temp_csv(
        "Date,A\n\
         2024-01-02,0.015\n\
         2024-01-03,-0.025\n",
    );
    let market = MarketData::cached(CsvCache::new(&path));
    let frame = market.returns(&request(&["A"]), &SilentWarnings).unwrap();

    assert_eq!(frame.column("A").unwrap(), &[0.015, -0.025]);

    let _ = fs::remove_file(&path);
}

#[test]
fn cache_date_slice_is_inclusive_on_both_ends() {
    let path = temp_csv(
        "Date,A\n\
         2024-01-02,101.0\n\
         2024-01-03,102.0\n\
         2024-01-04,103.0\n\
         2024-01-05,104.0\n",
    );
    let market = MarketData::cached(CsvCache::new(&path));

    let mut req = request(&["A"]);
    req.start = Some(date("2024-01-03"));
    req.end = Some(date("2024-01-04"));
    let frame = market.prices(&req, &SilentWarnings).unwrap();

    assert_eq!(frame.dates(), &[date("2024-01-03"), date("2024-01-04")]);
    assert_eq!(frame.column("A").unwrap(), &[102.0, 103.0]);

    let _ = fs::remove_file(&path);
}

// ── Live path ────────────────────────────────────────────────────────

fn live_market(days: usize) -> MarketData {
    MarketData::live(Box::new(SyntheticSource {
        tickers: vec!["SPY".into(), "QQQ".into()],
        days,
    }))
}

#[test]
fn live_prices_round_trip_through_returns() {
    let market = live_market(60);
    let req = request(&["SPY", "QQQ"]);

    let prices = market.prices(&req, &SilentWarnings).unwrap();
    let returns = market.returns(&req, &SilentWarnings).unwrap();

    assert_eq!(returns.height(), prices.height() - 1);

    // Reconstruction anchored at the first price reproduces the table.
    let growth = returns.cumulative_growth();
    for ticker in prices.tickers() {
        let p = prices.column(ticker).unwrap();
        let g = growth.column(ticker).unwrap();
        for (t, level) in g.iter().enumerate() {
            assert!(
                (level * p[0] - p[t + 1]).abs() <= 1e-9 * p[t + 1].abs(),
                "round-trip mismatch for {ticker} at row {t}"
            );
        }
    }
}

#[test]
fn full_synthetic_pipeline_produces_shaped_prices() {
    let market = live_market(150);
    let req = request(&["SPY", "QQQ"]);
    let synth = SyntheticReturns::new(2, 123);

    let simulated = synth.prices(&market, &req, &SilentWarnings).unwrap();

    // Same shape as the realized returns it was fitted on.
    let realized = market.returns(&req, &SilentWarnings).unwrap();
    assert_eq!(simulated.series.height(), realized.height());
    assert_eq!(simulated.series.tickers(), realized.tickers());

    // A price path from base 1.0 stays strictly positive.
    for ticker in simulated.series.tickers() {
        assert!(simulated
            .series
            .column(ticker)
            .unwrap()
            .iter()
            .all(|p| *p > 0.0 && p.is_finite()));
    }

    // The coefficient table covers const plus order×tickers rows.
    assert_eq!(simulated.params.index.len(), 1 + 2 * 2);
}

#[test]
fn live_request_where_every_ticker_fails_aborts() {
    let market = live_market(60);
    let synth = SyntheticReturns::new(1, 1);

    let result = synth.returns(&market, &request(&["NOPE"]), &SilentWarnings);
    assert!(result.is_err());
}
