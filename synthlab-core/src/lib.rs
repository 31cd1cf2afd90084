//! SynthLab Core — market-data retrieval and VAR-simulated series.
//!
//! The pipeline moves between prices → returns → fitted VAR(p) →
//! simulated returns → reconstructed simulated prices:
//! - [`frame`] — date-indexed, ticker-columned tables and their transforms
//! - [`data`] — live price source contract and wide-CSV cache
//! - [`market`] — canonical price/return frames over an explicit source
//! - [`clean`] — missing-value cleaning ahead of estimation
//! - [`var`] — least-squares VAR fit and seeded simulation
//! - [`synthetic`] — model-consistent alternative return/price series

pub mod clean;
pub mod data;
pub mod frame;
pub mod market;
pub mod synthetic;
pub mod var;
