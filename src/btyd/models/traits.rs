//! Shared model contracts: likelihood for fitting, predictions for use.
//!
//! Purpose
//! -------
//! Split what every buy-till-you-die model offers into two small traits so
//! the fitter and the CLV composition depend on capabilities rather than on
//! concrete models.
//!
//! Key behaviors
//! -------------
//! - [`BtydModel`]: parameter layout, data checks, per-subject
//!   log-likelihood and the weighted, penalized negative log-likelihood.
//!   Implemented by the model *descriptors* (`BetaGeo`, `ParetoNbd`, ...).
//! - [`PurchaseModel`]: closed-form purchase predictions. Implemented by the
//!   fitted *parameter* structs (`BetaGeoParams`, ...), so predictions never
//!   depend on mutable model state.
//! - [`ModelKind`]: the tag stored in persisted state.
//!
//! Invariants & assumptions
//! ------------------------
//! - `log_likelihood_terms` returns one unweighted contribution per subject;
//!   the weighted sum is formed in a fixed left-to-right order so the
//!   objective is exactly additive over disjoint subject batches.
//! - The penalty is `penalizer · W · Σ p²` with `W` the total weight and `p`
//!   the model-space parameters it is evaluated at.
//! - Prediction inputs use the caller's original time units.
//!
//! Downstream usage
//! ----------------
//! - `btyd::fitter::fit` drives any `BtydModel`.
//! - `btyd::clv` accepts any `PurchaseModel`.
use crate::btyd::{
    core::{
        data::{FitData, SummaryData},
        params::{ModelParams, ParamSpec, ParamVector},
    },
    errors::{BtydError, BtydResult},
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt, str::FromStr};

/// Tag identifying a model family in persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    BetaGeo,
    ModifiedBetaGeo,
    ParetoNbd,
    BetaGeoBetaBinom,
    GammaGamma,
    BetaGeoCovariates,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::BetaGeo => "BetaGeo",
            ModelKind::ModifiedBetaGeo => "ModifiedBetaGeo",
            ModelKind::ParetoNbd => "ParetoNbd",
            ModelKind::BetaGeoBetaBinom => "BetaGeoBetaBinom",
            ModelKind::GammaGamma => "GammaGamma",
            ModelKind::BetaGeoCovariates => "BetaGeoCovariates",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = BtydError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = [
            ModelKind::BetaGeo,
            ModelKind::ModifiedBetaGeo,
            ModelKind::ParetoNbd,
            ModelKind::BetaGeoBetaBinom,
            ModelKind::GammaGamma,
            ModelKind::BetaGeoCovariates,
        ];
        kinds
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BtydError::UnknownModelKind { name: s.to_string() })
    }
}

/// Likelihood contract consumed by the fitter.
///
/// Required:
/// - `KIND`, `param_specs`, `log_likelihood_terms`.
///
/// Optional:
/// - `check_data`: model-specific data requirements (default: none).
/// - `scales_time`: whether the fitter divides time columns by the median
///   age before optimizing (default: `true`).
/// - `params_from_values`: typed parameters from values in spec order
///   (default: name them from `param_specs` and go through `ModelParams`).
/// - `initial_values`: model-space starting point on (rescaled) data
///   (default: [`ParamSpec::default_value`] per parameter).
pub trait BtydModel: Clone + fmt::Debug + Serialize + DeserializeOwned {
    type Data: FitData;
    type Params: ModelParams;

    /// Tag stored in persisted state.
    const KIND: ModelKind;

    fn kind(&self) -> ModelKind {
        Self::KIND
    }

    /// Parameter layout for `data`, in optimizer order.
    fn param_specs(&self, data: &Self::Data) -> Vec<ParamSpec>;

    /// Per-subject, unweighted log-likelihood contributions.
    fn log_likelihood_terms(&self, params: &Self::Params, data: &Self::Data) -> Array1<f64>;

    fn check_data(&self, _data: &Self::Data) -> BtydResult<()> {
        Ok(())
    }

    fn scales_time(&self) -> bool {
        true
    }

    fn params_from_values(&self, values: &[f64], data: &Self::Data) -> BtydResult<Self::Params> {
        let names = self.param_specs(data).into_iter().map(|spec| spec.name).collect();
        Self::Params::from_vector(&ParamVector::new(names, values)?)
    }

    fn initial_values(&self, data: &Self::Data) -> Vec<f64> {
        self.param_specs(data).iter().map(ParamSpec::default_value).collect()
    }

    /// negative_log_likelihood — weighted sum of per-subject NLL plus an L2
    /// penalty.
    ///
    /// Parameters
    /// ----------
    /// - `params`: `&Self::Params`
    ///   Parameters in the same time units as `data`.
    /// - `data`: `&Self::Data`
    ///   Subjects and weights.
    /// - `penalizer`: `f64`
    ///   Non-negative penalty coefficient `λ`.
    ///
    /// Returns
    /// -------
    /// `f64`
    ///   `-Σ_i w_i ℓ_i + λ · W · Σ_k p_k²`. Non-finite when a contribution
    ///   is; the fitter treats that as an infeasible point.
    fn negative_log_likelihood(
        &self, params: &Self::Params, data: &Self::Data, penalizer: f64,
    ) -> f64 {
        let terms = self.log_likelihood_terms(params, data);
        let weighted = terms.iter().zip(data.weights().iter()).fold(0.0, |acc, (l, w)| acc + l * w);
        let penalty = if penalizer > 0.0 {
            let squares: f64 = params.to_vector().values().iter().map(|p| p * p).sum();
            penalizer * data.total_weight() * squares
        } else {
            0.0
        };
        -weighted + penalty
    }
}

/// Prediction contract of a fitted purchase-frequency model.
///
/// All time arguments are in the units of the data the parameters were
/// fitted on. Implemented by fitted parameter structs.
pub trait PurchaseModel {
    /// `E[X(t)]` for a randomly chosen new customer.
    fn expected_number_of_purchases_up_to_time(&self, t: f64) -> f64;

    /// `E[X(T, T + t] | x, t_x, T]` for a customer with the given history.
    fn conditional_expected_number_of_purchases_up_to_time(
        &self, t: f64, frequency: f64, recency: f64, age: f64,
    ) -> f64;

    /// Probability the customer is still active at `age`, in `[0, 1]`.
    fn conditional_probability_alive(&self, frequency: f64, recency: f64, age: f64) -> f64;

    /// `P(X(t) = n)` for a randomly chosen new customer.
    fn probability_of_n_purchases_up_to_time(&self, t: f64, n: u32) -> f64;

    /// Conditional expectations for every row of `data`.
    fn conditional_expected_number_of_purchases_batch(
        &self, t: f64, data: &SummaryData,
    ) -> Array1<f64> {
        data.rows()
            .map(|(x, t_x, age)| {
                self.conditional_expected_number_of_purchases_up_to_time(t, x, t_x, age)
            })
            .collect()
    }

    /// Probability alive for every row of `data`.
    fn conditional_probability_alive_batch(&self, data: &SummaryData) -> Array1<f64> {
        data.rows().map(|(x, t_x, age)| self.conditional_probability_alive(x, t_x, age)).collect()
    }

    /// conditional_probability_alive_matrix — `P(alive)` on a recency ×
    /// frequency grid.
    ///
    /// Parameters
    /// ----------
    /// - `max_frequency`: `usize`
    ///   Largest frequency column (inclusive).
    /// - `max_recency`: `usize`
    ///   Largest recency row (inclusive); also used as the age of every cell.
    ///
    /// Returns
    /// -------
    /// `Array2<f64>`
    ///   `(max_recency + 1) × (max_frequency + 1)` matrix with
    ///   `Z[[t_x, x]] = P(alive | x, t_x, max_recency)`.
    fn conditional_probability_alive_matrix(
        &self, max_frequency: usize, max_recency: usize,
    ) -> Array2<f64> {
        let age = max_recency as f64;
        Array2::from_shape_fn((max_recency + 1, max_frequency + 1), |(t_x, x)| {
            self.conditional_probability_alive(x as f64, t_x as f64, age)
        })
    }
}
