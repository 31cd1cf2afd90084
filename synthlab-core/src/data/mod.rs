//! Data sources: live provider contract and CSV cache.

pub mod cache;
pub mod provider;
pub mod quandl;

pub use cache::{CacheError, CsvCache};
pub use provider::{FetchError, PriceSource, RawSeries, SilentWarnings, StderrWarnings, WarningSink};
pub use quandl::QuandlSource;
