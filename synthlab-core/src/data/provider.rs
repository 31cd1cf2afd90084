//! Price source trait and per-ticker fetch results.
//!
//! The PriceSource trait abstracts over live market-data providers so the
//! orchestration layer can swap implementations and mock for tests. Errors
//! are values: a failed fetch never panics past this boundary, and the
//! orchestrator treats every error variant identically (ticker unavailable).

use chrono::NaiveDate;
use thiserror::Error;

/// A single ticker's raw adjusted-close series, date-ascending.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Why a single ticker's fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("fetch error: {0}")]
    Other(String),
}

/// Trait for live price providers.
///
/// Implementations handle the specifics of one provider's API. The
/// orchestration layer sits above this trait and owns per-ticker failure
/// policy — providers don't decide what a failure means for the batch.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the adjusted-close series for one ticker over an optional
    /// inclusive date range.
    fn fetch(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RawSeries, FetchError>;
}

/// Non-fatal warning emission. Implementations cannot fail by signature, so
/// a broken sink can never interrupt the pipeline.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

/// Prints warnings to stderr.
pub struct StderrWarnings;

impl WarningSink for StderrWarnings {
    fn warn(&self, message: &str) {
        eprintln!("WARNING: {message}");
    }
}

/// Swallows warnings; for quiet callers and tests.
pub struct SilentWarnings;

impl WarningSink for SilentWarnings {
    fn warn(&self, _message: &str) {}
}
