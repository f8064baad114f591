//! fit_result — the immutable outcome of one fit.
//!
//! Purpose
//! -------
//! Carry everything a fit produces: the model descriptor, typed and named
//! parameters in the caller's time units, the achieved objective, the scale
//! factor, optimizer status, optional Hessian diagnostics and (optionally)
//! the training data.
//!
//! Key behaviors
//! -------------
//! - Prediction goes through the public `params` field; a [`FitResult`] is
//!   never mutated after the fitter returns it.
//! - `Display` renders `<BetaGeo: fitted with N subjects, r: .., ...>`.
//! - [`FitResult::conditional_probability_alive_matrix`] defaults its grid
//!   bounds to the training data maxima.
//!
//! Invariants & assumptions
//! ------------------------
//! - `params` and `vector` describe the same values; `vector` follows the
//!   model layout order.
//! - `objective` is the penalized negative log-likelihood evaluated on the
//!   rescaled training data.
use crate::{
    btyd::{
        core::{data::SummaryData, params::ParamVector},
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, PurchaseModel},
    },
    inference::Diagnostics,
};
use ndarray::{Array1, Array2};
use std::fmt;

/// FitResult — fitted parameters plus diagnostics.
///
/// Fields
/// ------
/// - `model`: descriptor that was fitted (carries model options).
/// - `params`: typed parameters used by every prediction.
/// - `vector`: the same parameters as a named vector.
/// - `objective`: penalized NLL at the optimum (rescaled data).
/// - `scale`: time scale the data were divided by during the fit.
/// - `penalizer`: L2 coefficient used.
/// - `n_subjects`: number of training rows.
/// - `converged`, `iterations`, `status`, `solver`: optimizer report of the
///   winning start.
/// - `diagnostics`: covariance, standard errors and intervals; `None` when
///   the Hessian was singular or indefinite.
/// - `data`: training data when kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult<M: BtydModel> {
    pub model: M,
    pub params: M::Params,
    pub vector: ParamVector,
    pub objective: f64,
    pub scale: f64,
    pub penalizer: f64,
    pub n_subjects: usize,
    pub converged: bool,
    pub iterations: usize,
    pub status: String,
    pub solver: String,
    pub diagnostics: Option<Diagnostics>,
    pub data: Option<M::Data>,
}

impl<M: BtydModel> FitResult<M> {
    /// Training data, if they were kept.
    ///
    /// # Errors
    /// - `BtydError::MissingTrainingData` when the fit discarded them.
    pub fn training_data(&self) -> BtydResult<&M::Data> {
        self.data.as_ref().ok_or(BtydError::MissingTrainingData)
    }

    pub fn standard_errors(&self) -> Option<&Array1<f64>> {
        self.diagnostics.as_ref().map(|d| &d.standard_errors)
    }

    /// `k × 2` matrix of `[lower, upper]` bounds in layout order.
    pub fn confidence_intervals(&self) -> Option<&Array2<f64>> {
        self.diagnostics.as_ref().map(|d| &d.confidence_intervals)
    }

    pub fn covariance(&self) -> Option<&Array2<f64>> {
        self.diagnostics.as_ref().map(|d| &d.covariance)
    }

    /// Penalized NLL of the fitted parameters on `data`, in `data`'s units.
    pub fn negative_log_likelihood(&self, data: &M::Data) -> f64 {
        self.model.negative_log_likelihood(&self.params, data, self.penalizer)
    }

    /// Drop the training data, keeping parameters and diagnostics.
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }
}

impl<M> FitResult<M>
where
    M: BtydModel<Data = SummaryData>,
    M::Params: PurchaseModel,
{
    /// conditional_probability_alive_matrix — `P(alive)` grid over
    /// (recency, frequency).
    ///
    /// Parameters
    /// ----------
    /// - `bounds`: `Option<(usize, usize)>`
    ///   `(max_frequency, max_age)`. `None` uses the training maxima.
    ///
    /// Returns
    /// -------
    /// `BtydResult<Array2<f64>>`
    ///   `Z[[t_x, x]] = P(alive | x, t_x, max_age)`.
    ///
    /// Errors
    /// ------
    /// - `BtydError::MissingTrainingData` if `bounds` is `None` and the data
    ///   were discarded.
    pub fn conditional_probability_alive_matrix(
        &self, bounds: Option<(usize, usize)>,
    ) -> BtydResult<Array2<f64>> {
        let (max_frequency, max_age) = match bounds {
            Some(bounds) => bounds,
            None => self.training_data()?.max_frequency_and_age(),
        };
        Ok(self.params.conditional_probability_alive_matrix(max_frequency, max_age))
    }
}

impl<M: BtydModel> fmt::Display for FitResult<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: fitted with {} subjects, {}>",
            self.model.kind().name(),
            self.n_subjects,
            self.vector
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btyd::{
        core::{data::FitData, params::ModelParams},
        models::{
            beta_geo::{BetaGeo, BetaGeoParams},
            traits::ModelKind,
        },
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Display format and the probability-alive matrix bounds.
    // -------------------------------------------------------------------------

    fn result(keep_data: bool) -> FitResult<BetaGeo> {
        let params = BetaGeoParams::new(0.25, 4.0, 0.8, 2.5).expect("valid params");
        let data = SummaryData::new(
            array![0.0, 3.0, 5.0],
            array![0.0, 10.0, 20.0],
            array![30.0, 30.0, 32.0],
            None,
        )
        .expect("valid data");
        FitResult {
            model: BetaGeo,
            vector: params.to_vector(),
            params,
            objective: 10.0,
            scale: 30.0,
            penalizer: 0.0,
            n_subjects: data.n_subjects(),
            converged: true,
            iterations: 12,
            status: "Converged".to_string(),
            solver: "lbfgs".to_string(),
            diagnostics: None,
            data: keep_data.then_some(data),
        }
    }

    #[test]
    // Purpose
    // -------
    // `Display` names the model, the subject count and every parameter.
    //
    // Given
    // -----
    // - A BG/NBD result over three subjects.
    //
    // Expect
    // ------
    // - `<BetaGeo: fitted with 3 subjects, r: 0.25, alpha: 4.0, a: 0.8, b: 2.5>`.
    fn display_summarizes_fit() {
        let shown = result(true).to_string();
        assert_eq!(shown, "<BetaGeo: fitted with 3 subjects, r: 0.25, alpha: 4.0, a: 0.8, b: 2.5>");
        assert_eq!(ModelKind::BetaGeo.name(), "BetaGeo");
    }

    #[test]
    // Purpose
    // -------
    // The matrix defaults to training maxima and needs explicit bounds once
    // the data are dropped.
    //
    // Given
    // -----
    // - Training maxima (frequency 5, age 32); a copy without data.
    //
    // Expect
    // ------
    // - A 33 × 6 matrix; `MissingTrainingData` without bounds; explicit
    //   bounds still work.
    fn alive_matrix_bounds() {
        let kept = result(true);
        let z = kept.conditional_probability_alive_matrix(None).expect("data kept");
        assert_eq!(z.dim(), (33, 6));

        let dropped = result(true).without_data();
        assert_eq!(
            dropped.conditional_probability_alive_matrix(None),
            Err(BtydError::MissingTrainingData)
        );
        let explicit = dropped.conditional_probability_alive_matrix(Some((5, 32))).expect("bounds");
        assert_eq!(explicit, z);
    }
}
