//! Vector autoregression: least-squares fit and seeded simulation.
//!
//! `VarModel::fit` estimates a VAR(p) with intercept by ordinary least
//! squares over a fully populated return frame. `simulate` runs the fitted
//! recursion forward with Gaussian innovations drawn through the residual
//! covariance's Cholesky factor — deterministic for a fixed RNG. The model
//! is owned transiently by the caller and never persisted.

use crate::frame::Frame;
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model order must be at least 1 (got {0})")]
    InvalidOrder(usize),

    #[error("{rows} rows are too few to fit order {order} over {vars} variables")]
    InsufficientRows {
        rows: usize,
        order: usize,
        vars: usize,
    },

    #[error("normal equations are singular; returns may be collinear or constant")]
    Singular,
}

/// Fitted coefficients as a labeled table: one row per regressor (`const`,
/// then `l{lag}.{ticker}`), one column per equation.
#[derive(Debug, Clone)]
pub struct ParamsTable {
    pub index: Vec<String>,
    pub tickers: Vec<String>,
    /// Row-major: `values[r][c]` is the coefficient of regressor `index[r]`
    /// in the equation for `tickers[c]`.
    pub values: Vec<Vec<f64>>,
}

impl ParamsTable {
    /// Coefficient of `label` in the equation for `ticker`.
    pub fn get(&self, label: &str, ticker: &str) -> Option<f64> {
        let r = self.index.iter().position(|l| l == label)?;
        let c = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.values[r][c])
    }
}

/// A fitted VAR(p) model.
pub struct VarModel {
    order: usize,
    tickers: Vec<String>,
    intercept: DVector<f64>,
    /// One k-by-k matrix per lag: `y_t = c + Σ coeffs[i-1] · y_{t-i} + ε_t`.
    coeffs: Vec<DMatrix<f64>>,
    /// Lower-triangular L with L·Lᵀ equal to the residual covariance.
    chol: DMatrix<f64>,
}

impl VarModel {
    /// Least-squares fit of a VAR(`order`) to a fully populated frame.
    pub fn fit(frame: &Frame, order: usize) -> Result<VarModel, ModelError> {
        if order < 1 {
            return Err(ModelError::InvalidOrder(order));
        }

        let k = frame.width();
        let rows = frame.height();
        let rows_eff = rows.saturating_sub(order);
        let regressors = 1 + k * order;
        // The residual-covariance denominator needs at least one degree of
        // freedom past the parameter count.
        if k == 0 || rows_eff <= regressors {
            return Err(ModelError::InsufficientRows {
                rows,
                order,
                vars: k,
            });
        }

        let columns = frame.raw_columns();

        // A constant variable is collinear with the intercept; LU pivots may
        // round past exact zero, so catch it up front.
        for column in columns {
            let mean = column.iter().sum::<f64>() / rows as f64;
            let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / rows as f64;
            if var < 1e-24 {
                return Err(ModelError::Singular);
            }
        }

        // X row t: [1, y_{t-1}(all vars), ..., y_{t-order}(all vars)].
        let x = DMatrix::from_fn(rows_eff, regressors, |r, c| {
            if c == 0 {
                1.0
            } else {
                let lag = (c - 1) / k + 1;
                let var = (c - 1) % k;
                columns[var][r + order - lag]
            }
        });
        let y = DMatrix::from_fn(rows_eff, k, |r, c| columns[c][r + order]);

        let xtx = x.transpose() * &x;
        let xty = x.transpose() * &y;
        let beta = xtx.lu().solve(&xty).ok_or(ModelError::Singular)?;
        if beta.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Singular);
        }

        let residuals = &y - &x * &beta;
        let sigma =
            residuals.transpose() * &residuals / (rows_eff - regressors) as f64;

        // A numerically semidefinite covariance (near-perfectly correlated
        // residuals) falls back to independent per-variable noise.
        let chol = match Cholesky::new(sigma.clone()) {
            Some(c) => c.l(),
            None => DMatrix::from_diagonal(&sigma.diagonal().map(|v| v.max(0.0).sqrt())),
        };

        let intercept = beta.row(0).transpose();
        let coeffs = (0..order)
            .map(|i| beta.rows(1 + i * k, k).transpose())
            .collect();

        Ok(VarModel {
            order,
            tickers: frame.tickers().to_vec(),
            intercept,
            coeffs,
            chol,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Run the fitted recursion forward from `initial` (exactly `order`
    /// rows, oldest first) for `steps` steps.
    pub fn simulate(
        &self,
        initial: &[Vec<f64>],
        steps: usize,
        rng: &mut StdRng,
    ) -> Vec<Vec<f64>> {
        assert_eq!(
            initial.len(),
            self.order,
            "initial window must hold exactly one row per lag"
        );

        let k = self.tickers.len();
        let mut history: Vec<DVector<f64>> = initial
            .iter()
            .map(|row| DVector::from_column_slice(row))
            .collect();
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            let mut mean = self.intercept.clone();
            for (i, coeff) in self.coeffs.iter().enumerate() {
                mean += coeff * &history[history.len() - 1 - i];
            }
            let z = DVector::from_fn(k, |_, _| rng.sample(StandardNormal));
            let y = mean + &self.chol * z;

            out.push(y.iter().copied().collect());
            history.push(y);
            if history.len() > self.order {
                history.remove(0);
            }
        }

        out
    }

    /// Coefficients as a labeled table (statsmodels-style row labels).
    pub fn params(&self) -> ParamsTable {
        let k = self.tickers.len();
        let mut index = vec!["const".to_string()];
        let mut values = vec![self.intercept.iter().copied().collect::<Vec<f64>>()];

        for (i, coeff) in self.coeffs.iter().enumerate() {
            for (v, ticker) in self.tickers.iter().enumerate() {
                index.push(format!("l{}.{}", i + 1, ticker));
                values.push((0..k).map(|e| coeff[(e, v)]).collect());
            }
        }

        ParamsTable {
            index,
            tickers: self.tickers.clone(),
            values,
        }
    }
}

/// Fit a VAR(`order`) and simulate a frame with the same shape as the
/// input: the first `order` rows are the observed initial conditions, the
/// remaining rows are simulated. Dates reuse the input's index — the output
/// shares the input's shape, not its calendar meaning.
pub fn fit_and_simulate(
    frame: &Frame,
    order: usize,
    rng: &mut StdRng,
) -> Result<(Frame, VarModel), ModelError> {
    let model = VarModel::fit(frame, order)?;

    let initial: Vec<Vec<f64>> = (0..order).map(|i| frame.row(i)).collect();
    let steps = frame.height() - order;
    let simulated = model.simulate(&initial, steps, rng);

    let k = frame.width();
    let mut columns = vec![Vec::with_capacity(frame.height()); k];
    for row in initial.iter().chain(simulated.iter()) {
        for (c, v) in row.iter().enumerate() {
            columns[c].push(*v);
        }
    }

    let sim_frame = Frame::from_raw_parts(
        frame.dates().to_vec(),
        frame.tickers().to_vec(),
        columns,
    );
    Ok((sim_frame, model))
}
