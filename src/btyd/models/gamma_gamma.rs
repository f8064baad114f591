//! Gamma-Gamma — spend per transaction.
//!
//! Purpose
//! -------
//! Model the average transaction value of repeat customers: individual
//! spend is Gamma with shape `p` and rate `ν`, and `ν ~ Gamma(q, v)` across
//! customers. Used alongside a purchase model to price customer lifetime
//! value.
//!
//! Key behaviors
//! -------------
//! - [`GammaGamma`] implements [`BtydModel`] on [`MonetaryData`]; spend has
//!   no time dimension, so nothing is rescaled.
//! - `q_constraint` fits `q = 1 + exp(θ)`, keeping the population mean
//!   spend `pv/(q-1)` finite.
//! - [`GammaGammaParams::conditional_expected_average_profit`] shrinks a
//!   customer's observed average toward the population mean.
//!
//! Invariants & assumptions
//! ------------------------
//! - Fitting requires `frequency > 0` and `monetary_value > 0` for every
//!   subject; prediction accepts `frequency = 0` and returns the population
//!   mean.
//! - For `q ≤ 1` the population mean is infinite and reported as `+∞`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the zero-frequency fallback, the shrinkage ordering
//!   and the fitting-data requirements.
use crate::{
    btyd::{
        core::{
            data::{FitData, MonetaryData},
            params::{ModelParams, ParamSpec, ParamVector, positive_param},
        },
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, ModelKind},
    },
    special_functions::gamma_beta::ln_gamma,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Gamma-Gamma model descriptor.
///
/// - `q_constraint`: fit `q` on `(1, ∞)` instead of `(0, ∞)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GammaGamma {
    pub q_constraint: bool,
}

impl GammaGamma {
    pub fn new(q_constraint: bool) -> Self {
        Self { q_constraint }
    }
}

/// Fitted Gamma-Gamma parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaGammaParams {
    pub p: f64,
    pub q: f64,
    pub v: f64,
}

impl GammaGammaParams {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidParams` if any value is not finite and positive.
    pub fn new(p: f64, q: f64, v: f64) -> BtydResult<Self> {
        Ok(Self {
            p: positive_param("p", p)?,
            q: positive_param("q", q)?,
            v: positive_param("v", v)?,
        })
    }

    /// Per-subject log-likelihood of `x` transactions averaging `m`.
    pub fn log_likelihood(&self, frequency: f64, monetary_value: f64) -> f64 {
        let Self { p, q, v } = *self;
        let (x, m) = (frequency, monetary_value);
        let px = p * x;
        ln_gamma(px + q) - ln_gamma(px) - ln_gamma(q) + q * v.ln() + (px - 1.0) * m.ln()
            + px * x.ln()
            - (px + q) * (x * m + v).ln()
    }

    /// Population mean spend per transaction, `pv / (q - 1)`.
    pub fn expected_average_profit(&self) -> f64 {
        if self.q <= 1.0 {
            return f64::INFINITY;
        }
        self.p * self.v / (self.q - 1.0)
    }

    /// conditional_expected_average_profit — `E[M | x, m]`.
    ///
    /// Parameters
    /// ----------
    /// - `frequency`: `f64`
    ///   Number of transactions behind `monetary_value`.
    /// - `monetary_value`: `f64`
    ///   Observed average spend.
    ///
    /// Returns
    /// -------
    /// `f64`
    ///   `p(v + x·m) / (px + q - 1)`, which is `(1 - w) · pv/(q-1) + w · m`
    ///   with `w = px / (px + q - 1)` when `q > 1`; the population mean when
    ///   `x = 0`.
    ///
    /// Notes
    /// -----
    /// - With `px + q ≤ 1` the posterior mean of `p/ν` does not exist and
    ///   `+∞` is returned, as for the population mean with `q ≤ 1`. Fit with
    ///   `q_constraint` to keep every value finite.
    pub fn conditional_expected_average_profit(&self, frequency: f64, monetary_value: f64) -> f64 {
        if frequency <= 0.0 {
            return self.expected_average_profit();
        }
        let Self { p, q, v } = *self;
        let px = p * frequency;
        let denominator = px + q - 1.0;
        if denominator <= 0.0 {
            return f64::INFINITY;
        }
        p * (v + frequency * monetary_value) / denominator
    }

    /// Conditional expected average profit for every row of `data`.
    pub fn conditional_expected_average_profit_batch(&self, data: &MonetaryData) -> Array1<f64> {
        data.frequency
            .iter()
            .zip(data.monetary_value.iter())
            .map(|(&x, &m)| self.conditional_expected_average_profit(x, m))
            .collect()
    }
}

impl ModelParams for GammaGammaParams {
    fn to_vector(&self) -> ParamVector {
        ParamVector::from_pairs([("p", self.p), ("q", self.q), ("v", self.v)])
    }

    fn from_vector(vector: &ParamVector) -> BtydResult<Self> {
        match vector.unload(&["p", "q", "v"])?.as_slice() {
            &[p, q, v] => Self::new(p, q, v),
            other => Err(BtydError::ParamCountMismatch { expected: 3, found: other.len() }),
        }
    }
}

impl BtydModel for GammaGamma {
    type Data = MonetaryData;
    type Params = GammaGammaParams;

    const KIND: ModelKind = ModelKind::GammaGamma;

    fn param_specs(&self, _data: &MonetaryData) -> Vec<ParamSpec> {
        let q = if self.q_constraint {
            ParamSpec::shifted_positive("q")
        } else {
            ParamSpec::positive("q")
        };
        vec![ParamSpec::positive("p"), q, ParamSpec::positive("v")]
    }

    fn log_likelihood_terms(&self, params: &GammaGammaParams, data: &MonetaryData) -> Array1<f64> {
        data.frequency
            .iter()
            .zip(data.monetary_value.iter())
            .map(|(&x, &m)| params.log_likelihood(x, m))
            .collect()
    }

    /// Every subject needs at least one transaction with positive spend.
    fn check_data(&self, data: &MonetaryData) -> BtydResult<()> {
        if let Some(index) = data.frequency.iter().position(|&x| x <= 0.0) {
            return Err(BtydError::InvalidObservation {
                column: "frequency",
                index,
                value: data.frequency[index],
                reason: "spend models are fitted on repeat customers only",
            });
        }
        if let Some(index) = data.monetary_value.iter().position(|&m| m <= 0.0) {
            return Err(BtydError::InvalidMonetaryValue {
                index,
                value: data.monetary_value[index],
                reason: "must be strictly positive for fitting",
            });
        }
        Ok(())
    }

    fn scales_time(&self) -> bool {
        false
    }

    /// `p = 1`, `q = 2` and `v` equal to the weighted mean spend, which puts
    /// the starting population mean `pv/(q-1)` at the observed one.
    fn initial_values(&self, data: &MonetaryData) -> Vec<f64> {
        let total = data.total_weight();
        let mean = data
            .monetary_value
            .iter()
            .zip(data.weights.iter())
            .fold(0.0, |acc, (m, w)| acc + m * w)
            / total;
        let v = if mean.is_finite() && mean > 0.0 { mean } else { 1.0 };
        vec![1.0, 2.0, v]
    }
}
