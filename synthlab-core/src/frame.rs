//! Date-indexed, ticker-columned numeric table.
//!
//! `Frame` is the one table type behind both price and return series. Dates
//! are strictly increasing and unique, tickers are ordered and unique, and
//! missing observations are NaN. Every pipeline stage produces a new `Frame`
//! rather than mutating its input.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural errors raised when assembling a frame from raw parts.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("{columns} columns do not match {tickers} tickers")]
    ColumnCountMismatch { columns: usize, tickers: usize },

    #[error("column '{ticker}' has {rows} rows, expected {expected}")]
    RaggedColumn {
        ticker: String,
        rows: usize,
        expected: usize,
    },

    #[error("dates must be strictly increasing (violation at row {0})")]
    UnsortedDates(usize),

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),
}

/// Target calendar spacing after aggregation. Rows are the last observation
/// in each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Business-daily: weekday observations, one row per date.
    Business,
    /// Last observation per ISO week.
    Weekly,
    /// Last observation per calendar month.
    Monthly,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Business
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "business" | "b" => Ok(Frequency::Business),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            other => Err(format!(
                "unknown frequency '{other}' (expected business, weekly, or monthly)"
            )),
        }
    }
}

impl Frequency {
    /// Bucket key for last-observation-per-period aggregation.
    fn period_key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            // One bucket per date; weekend handling happens in the caller.
            Frequency::Business => (date.year(), date.ordinal()),
            Frequency::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Frequency::Monthly => (date.year(), date.month()),
        }
    }
}

/// A date-indexed, ticker-columned table of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    /// Column-major; `columns[c].len() == dates.len()` for every column.
    columns: Vec<Vec<f64>>,
}

impl Frame {
    /// Assemble a frame, validating shape and index ordering.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, FrameError> {
        if columns.len() != tickers.len() {
            return Err(FrameError::ColumnCountMismatch {
                columns: columns.len(),
                tickers: tickers.len(),
            });
        }
        for (ticker, column) in tickers.iter().zip(&columns) {
            if column.len() != dates.len() {
                return Err(FrameError::RaggedColumn {
                    ticker: ticker.clone(),
                    rows: column.len(),
                    expected: dates.len(),
                });
            }
        }
        for (i, pair) in dates.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(FrameError::UnsortedDates(i + 1));
            }
        }
        for (i, ticker) in tickers.iter().enumerate() {
            if tickers[..i].contains(ticker) {
                return Err(FrameError::DuplicateTicker(ticker.clone()));
            }
        }
        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    /// A frame with the given columns and zero rows.
    pub fn empty(tickers: Vec<String>) -> Self {
        let columns = vec![Vec::new(); tickers.len()];
        Self {
            dates: Vec::new(),
            tickers,
            columns,
        }
    }

    /// Internal constructor for operations that uphold the invariants
    /// themselves (derived frames reuse an already-validated index).
    pub(crate) fn from_raw_parts(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(tickers.len(), columns.len());
        debug_assert!(columns.iter().all(|c| c.len() == dates.len()));
        Self {
            dates,
            tickers,
            columns,
        }
    }

    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn width(&self) -> usize {
        self.tickers.len()
    }

    /// True when the frame has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Column values for `ticker`, if present.
    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    pub(crate) fn raw_columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Values of row `i` in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }

    pub fn has_nan(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.iter().any(|v| v.is_nan()))
    }

    /// Restrict to the intersection of `requested` and this frame's columns.
    ///
    /// Output order follows THIS frame's native column order, not the
    /// requested order. Unknown tickers are dropped silently.
    pub fn select(&self, requested: &[String]) -> Frame {
        let mut tickers = Vec::new();
        let mut columns = Vec::new();
        for (ticker, column) in self.tickers.iter().zip(&self.columns) {
            if requested.contains(ticker) {
                tickers.push(ticker.clone());
                columns.push(column.clone());
            }
        }
        Frame::from_raw_parts(self.dates.clone(), tickers, columns)
    }

    /// Inclusive date-label slicing. Either bound may be absent. A start past
    /// the last date yields an empty frame, not an error.
    pub fn slice_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Frame {
        let lo = match start {
            Some(s) => self.dates.partition_point(|d| *d < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.dates.partition_point(|d| *d <= e),
            None => self.dates.len(),
        };
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (lo, lo) };
        let dates = self.dates[lo..hi].to_vec();
        let columns = self
            .columns
            .iter()
            .map(|c| c[lo..hi].to_vec())
            .collect();
        Frame::from_raw_parts(dates, self.tickers.clone(), columns)
    }

    /// Period-over-period fractional change. One row shorter than `self`
    /// (the first observation has no prior row); NaN inputs propagate.
    pub fn pct_change(&self) -> Frame {
        if self.height() < 2 {
            return Frame::empty(self.tickers.clone());
        }
        let dates = self.dates[1..].to_vec();
        let columns = self
            .columns
            .iter()
            .map(|c| c.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
            .collect();
        Frame::from_raw_parts(dates, self.tickers.clone(), columns)
    }

    /// Cumulative-product price reconstruction from a return frame.
    ///
    /// `price[0] = 1 + return[0]`, `price[t] = price[t-1] * (1 + return[t])`.
    /// The implicit base is 1.0, not any real asset's starting price; callers
    /// needing an absolute level rescale themselves. Strict left-to-right
    /// scan: each row depends on the previous one.
    pub fn cumulative_growth(&self) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut level = 1.0;
                c.iter()
                    .map(|r| {
                        level *= 1.0 + r;
                        level
                    })
                    .collect()
            })
            .collect();
        Frame::from_raw_parts(self.dates.clone(), self.tickers.clone(), columns)
    }

    /// Resample to `freq` keeping the last observation in each period.
    ///
    /// `Business` keeps one row per weekday date and drops weekend
    /// observations; `Weekly`/`Monthly` aggregate to period ends.
    pub fn resample_last(&self, freq: Frequency) -> Frame {
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut last_key: Option<(i32, u32)> = None;

        for (i, date) in self.dates.iter().enumerate() {
            if freq == Frequency::Business
                && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            {
                continue;
            }
            let key = freq.period_key(*date);
            let row = self.row(i);
            if last_key == Some(key) {
                *dates.last_mut().unwrap() = *date;
                *rows.last_mut().unwrap() = row;
            } else {
                dates.push(*date);
                rows.push(row);
                last_key = Some(key);
            }
        }

        let mut columns = vec![Vec::with_capacity(dates.len()); self.width()];
        for row in &rows {
            for (c, v) in row.iter().enumerate() {
                columns[c].push(*v);
            }
        }
        Frame::from_raw_parts(dates, self.tickers.clone(), columns)
    }
}
