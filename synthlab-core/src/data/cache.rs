//! Wide-CSV cache source.
//!
//! Layout: one file, a `Date` column plus one column per ticker. A cache
//! holds either prices or returns — the file is served as-is, and the
//! orchestration layer decides which it is. Beyond the date column the
//! loader trusts the schema; column selection happens downstream by name
//! intersection.

use crate::frame::Frame;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DATE_COLUMN: &str = "Date";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache read failed for {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("cache file {path} has no 'Date' column")]
    MissingDateColumn { path: String },

    #[error("cache file {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

/// A CSV file on disk, loadable as a full [`Frame`].
#[derive(Debug, Clone)]
pub struct CsvCache {
    path: PathBuf,
}

impl CsvCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full table, sorted ascending by date.
    pub fn load(&self) -> Result<Frame, CacheError> {
        let path_str = self.path.display().to_string();

        let df = LazyCsvReader::new(&self.path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()
            .map_err(|e| CacheError::Read {
                path: path_str.clone(),
                reason: e.to_string(),
            })?
            .collect()
            .map_err(|e| CacheError::Read {
                path: path_str.clone(),
                reason: e.to_string(),
            })?;

        if df.column(DATE_COLUMN).is_err() {
            return Err(CacheError::MissingDateColumn { path: path_str });
        }

        let df = df
            .sort([DATE_COLUMN], SortMultipleOptions::default())
            .map_err(|e| CacheError::Malformed {
                path: path_str.clone(),
                reason: e.to_string(),
            })?;

        frame_from_dataframe(&df, &path_str)
    }
}

/// Convert a collected DataFrame into a [`Frame`]: parse the date index,
/// cast every other column to f64 (nulls become NaN).
fn frame_from_dataframe(df: &DataFrame, path: &str) -> Result<Frame, CacheError> {
    let date_col = df
        .column(DATE_COLUMN)
        .map_err(|_| CacheError::MissingDateColumn {
            path: path.to_string(),
        })?;

    let date_ca = date_col.date().map_err(|e| CacheError::Malformed {
        path: path.to_string(),
        reason: format!("'Date' column is not a date: {e}"),
    })?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let mut dates = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca.get(i).ok_or_else(|| CacheError::Malformed {
            path: path.to_string(),
            reason: format!("null date at row {i}"),
        })?;
        dates.push(epoch + chrono::Duration::days(days as i64));
    }

    let mut tickers = Vec::new();
    let mut columns = Vec::new();
    for col in df.get_columns() {
        if col.name().as_str() == DATE_COLUMN {
            continue;
        }
        let values = col
            .cast(&DataType::Float64)
            .map_err(|e| CacheError::Malformed {
                path: path.to_string(),
                reason: format!("column '{}' is not numeric: {e}", col.name()),
            })?;
        let ca = values.f64().map_err(|e| CacheError::Malformed {
            path: path.to_string(),
            reason: format!("column '{}' read failed: {e}", col.name()),
        })?;

        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            out.push(ca.get(i).unwrap_or(f64::NAN));
        }
        tickers.push(col.name().to_string());
        columns.push(out);
    }

    Frame::new(dates, tickers, columns).map_err(|e| CacheError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_csv(contents: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path =
            env::temp_dir().join(format!("synthlab_cache_{}_{id}.csv", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_parses_wide_csv_sorted_by_date() {
        // Rows deliberately out of order.
        let path = temp_csv(
            "Date,AAPL,MSFT\n\
             2024-01-03,102.5,201.0\n\
             2024-01-02,101.0,200.0\n",
        );
        let frame = CsvCache::new(&path).load().unwrap();

        assert_eq!(frame.tickers(), &["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(
            frame.dates(),
            &[
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ]
        );
        assert_eq!(frame.column("AAPL").unwrap(), &[101.0, 102.5]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_turns_missing_cells_into_nan() {
        let path = temp_csv(
            "Date,AAPL\n\
             2024-01-02,101.0\n\
             2024-01-03,\n",
        );
        let frame = CsvCache::new(&path).load().unwrap();

        let aapl = frame.column("AAPL").unwrap();
        assert_eq!(aapl[0], 101.0);
        assert!(aapl[1].is_nan());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let cache = CsvCache::new("/nonexistent/synthlab.csv");
        assert!(matches!(cache.load(), Err(CacheError::Read { .. })));
    }

    #[test]
    fn load_without_date_column_fails() {
        let path = temp_csv("Day,AAPL\n2024-01-02,101.0\n");
        let result = CsvCache::new(&path).load();

        assert!(matches!(
            result,
            Err(CacheError::MissingDateColumn { .. })
        ));

        let _ = fs::remove_file(&path);
    }
}
