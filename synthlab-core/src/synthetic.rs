//! Model-consistent synthetic return and price series.
//!
//! `SyntheticReturns` drives the full pipeline: realized returns from
//! `MarketData`, cleaning, VAR fit, simulation, and (for prices) cumulative
//! reconstruction. Stateless request/response: every call re-fetches, refits,
//! and reseeds its own RNG from the configured seed.

use crate::clean::clean;
use crate::data::provider::WarningSink;
use crate::market::{MarketData, MarketError, SeriesRequest};
use crate::var::{fit_and_simulate, ModelError, ParamsTable};
use crate::frame::Frame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Data(#[from] MarketError),

    #[error("model fit failed: {0}")]
    ModelFit(#[from] ModelError),
}

/// A simulated series together with the fitted model's coefficient table.
///
/// Parameters are always carried; callers that don't need them ignore the
/// field.
#[derive(Debug, Clone)]
pub struct Simulated {
    pub series: Frame,
    pub params: ParamsTable,
}

/// Generator of VAR-simulated alternatives to realized series.
pub struct SyntheticReturns {
    order: usize,
    seed: u64,
}

impl SyntheticReturns {
    pub fn new(order: usize, seed: u64) -> Self {
        Self { order, seed }
    }

    /// Simulated return table with the same columns and row count as the
    /// cleaned realized returns used to fit the model.
    pub fn returns(
        &self,
        market: &MarketData,
        req: &SeriesRequest,
        sink: &dyn WarningSink,
    ) -> Result<Simulated, SimError> {
        // Invalid order aborts before any data is fetched.
        if self.order < 1 {
            return Err(SimError::ModelFit(ModelError::InvalidOrder(self.order)));
        }

        let realized = market.returns(req, sink)?;
        let cleaned = clean(&realized);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let (series, model) = fit_and_simulate(&cleaned, self.order, &mut rng)?;

        Ok(Simulated {
            series,
            params: model.params(),
        })
    }

    /// Simulated price path reconstructed from simulated returns.
    ///
    /// The path starts from an implicit base of 1.0 (`price[0] = 1 +
    /// return[0]`), not the real asset's starting price — callers needing an
    /// absolute level rescale by the real first price themselves.
    pub fn prices(
        &self,
        market: &MarketData,
        req: &SeriesRequest,
        sink: &dyn WarningSink,
    ) -> Result<Simulated, SimError> {
        let Simulated { series, params } = self.returns(market, req, sink)?;

        // Re-clean before the scan: the seed rows come from the cleaned
        // realized table, but cleaning again keeps the no-NaN precondition
        // local to the reconstruction.
        let cleaned = clean(&series);
        debug_assert!(!cleaned.has_nan());

        Ok(Simulated {
            series: cleaned.cumulative_growth(),
            params,
        })
    }
}
