//! MBG/NBD — modified beta-geometric / negative binomial purchase model.
//!
//! Purpose
//! -------
//! Variant of BG/NBD in which a customer may also drop out at time zero,
//! before any repeat purchase. The parameters `(r, α, a, b)` keep their
//! BG/NBD meaning.
//!
//! Key behaviors
//! -------------
//! - [`ModifiedBetaGeo`] implements [`BtydModel`]; `α` is time-scaled.
//! - [`ModifiedBetaGeoParams`] implements [`PurchaseModel`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Because dropout is possible before the first repeat purchase,
//!   `P(alive) < 1` for every history, including `x = 0`.
//!
//! Testing notes
//! -------------
//! - Unit tests check pmf normalization, `E[X(t)] = Σ n P(n)`, the
//!   reduction of the conditional expectation for a zero-length history,
//!   and `P(alive) < 1` at `x = 0`.
use crate::{
    btyd::{
        core::{
            data::SummaryData,
            params::{ModelParams, ParamSpec, ParamVector, positive_param},
        },
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, ModelKind, PurchaseModel},
    },
    special_functions::{
        gamma_beta::{ln_beta, ln_factorial, ln_gamma, regularized_incomplete_beta},
        hypergeometric::scaled_gamma_tail,
        log_sum_exp::log_add_exp,
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// MBG/NBD model descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedBetaGeo;

/// Fitted MBG/NBD parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifiedBetaGeoParams {
    pub r: f64,
    pub alpha: f64,
    pub a: f64,
    pub b: f64,
}

impl ModifiedBetaGeoParams {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidParams` if any value is not finite and positive.
    pub fn new(r: f64, alpha: f64, a: f64, b: f64) -> BtydResult<Self> {
        Ok(Self {
            r: positive_param("r", r)?,
            alpha: positive_param("alpha", alpha)?,
            a: positive_param("a", a)?,
            b: positive_param("b", b)?,
        })
    }

    /// Per-subject log-likelihood.
    pub fn log_likelihood(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        let Self { r, alpha, a, b } = *self;
        let x = frequency;
        let a1 = ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln();
        let a2 = ln_gamma(a + b) + ln_gamma(b + x + 1.0) - ln_gamma(b) - ln_gamma(a + b + x + 1.0);
        let a3 = -(r + x) * (alpha + age).ln();
        a1 + a2 + a3 + log_add_exp(0.0, self.log_dropout_odds(x, recency, age))
    }

    /// `ln[a/(b+x) · ((α+T)/(α+t_x))^(r+x)]`, defined for every `x ≥ 0`.
    fn log_dropout_odds(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        let Self { r, alpha, a, b } = *self;
        let x = frequency;
        a.ln() - (b + x).ln() + (r + x) * ((alpha + age).ln() - (alpha + recency).ln())
    }
}

impl ModelParams for ModifiedBetaGeoParams {
    fn to_vector(&self) -> ParamVector {
        ParamVector::from_pairs([("r", self.r), ("alpha", self.alpha), ("a", self.a), ("b", self.b)])
    }

    fn from_vector(vector: &ParamVector) -> BtydResult<Self> {
        match vector.unload(&["r", "alpha", "a", "b"])?.as_slice() {
            &[r, alpha, a, b] => Self::new(r, alpha, a, b),
            other => Err(BtydError::ParamCountMismatch { expected: 4, found: other.len() }),
        }
    }
}

impl BtydModel for ModifiedBetaGeo {
    type Data = SummaryData;
    type Params = ModifiedBetaGeoParams;

    const KIND: ModelKind = ModelKind::ModifiedBetaGeo;

    fn param_specs(&self, _data: &SummaryData) -> Vec<ParamSpec> {
        vec![
            ParamSpec::positive("r"),
            ParamSpec::time_scaled("alpha"),
            ParamSpec::positive("a"),
            ParamSpec::positive("b"),
        ]
    }

    fn log_likelihood_terms(
        &self, params: &ModifiedBetaGeoParams, data: &SummaryData,
    ) -> Array1<f64> {
        data.rows().map(|(x, t_x, age)| params.log_likelihood(x, t_x, age)).collect()
    }
}

impl PurchaseModel for ModifiedBetaGeoParams {
    /// `E[X(t)] = b/(a-1) · [1 - ₂F₁(r, b+1; a+b; t/(α+t)) · (α/(α+t))^r]`.
    fn expected_number_of_purchases_up_to_time(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { r, alpha, a, b } = *self;
        scaled_gamma_tail(b, r, alpha, a, b + 1.0, a + b, t)
    }

    fn conditional_expected_number_of_purchases_up_to_time(
        &self, t: f64, frequency: f64, recency: f64, age: f64,
    ) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { r, alpha, a, b } = *self;
        let x = frequency;
        let c = a + b + x;
        let numerator = scaled_gamma_tail(c, r + x, alpha + age, a, b + x + 1.0, c, t);
        numerator * (-log_add_exp(0.0, self.log_dropout_odds(x, recency, age))).exp()
    }

    fn conditional_probability_alive(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        (-log_add_exp(0.0, self.log_dropout_odds(frequency, recency, age))).exp()
    }

    fn probability_of_n_purchases_up_to_time(&self, t: f64, n: u32) -> f64 {
        let Self { r, alpha, a, b } = *self;
        let nf = f64::from(n);
        if t <= 0.0 {
            return if n == 0 { 1.0 } else { 0.0 };
        }
        let p = alpha / (alpha + t);
        let mut log_nb = ln_gamma(r + nf) - ln_gamma(r) - ln_factorial(nf) + r * p.ln();
        if n > 0 {
            log_nb += nf * (t / (alpha + t)).ln();
        }
        let alive = (ln_beta(a, b + nf + 1.0) - ln_beta(a, b) + log_nb).exp();
        let dropout = (ln_beta(a + 1.0, b + nf) - ln_beta(a, b)).exp();
        let reached = if n > 0 { regularized_incomplete_beta(nf, r, t / (alpha + t)) } else { 1.0 };
        alive + dropout * reached
    }
}
