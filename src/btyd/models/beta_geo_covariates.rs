//! BG/NBD with covariates — log-linear links on the latent parameters.
//!
//! Purpose
//! -------
//! Extend BG/NBD with per-subject covariates: transaction covariates scale
//! the Gamma rate of the purchase process, dropout covariates scale both
//! shapes of the dropout Beta.
//!
//! Key behaviors
//! -------------
//! - Individual parameters are
//!   `α_i = α₀ · exp(-γ_trᵀ x_tr,i)`, `a_i = a₀ · exp(γ_aᵀ x_do,i)`,
//!   `b_i = b₀ · exp(γ_bᵀ x_do,i)`; `r` is shared.
//! - [`BetaGeoCovariateParams::for_subject`] returns the individual
//!   [`BetaGeoParams`], so every BG/NBD formula is available per subject.
//! - [`BetaGeoCovariates`] implements [`BtydModel`] on [`CovariateData`];
//!   `α₀` is time-scaled, coefficients are unconstrained.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameter layout: `r, alpha0, a0, b0`, then `gamma_tr_{k}` per
//!   transaction covariate, then `gamma_a_{j}` and `gamma_b_{j}` per
//!   dropout covariate.
//! - With all coefficients zero the model coincides with BG/NBD.
//!
//! Testing notes
//! -------------
//! - Unit tests check the zero-coefficient reduction, the link directions
//!   and the named-vector round trip.
use crate::btyd::{
    core::{
        data::{CovariateData, FitData},
        params::{ModelParams, ParamSpec, ParamVector, finite_param, positive_param},
    },
    errors::{BtydError, BtydResult},
    models::{
        beta_geo::BetaGeoParams,
        traits::{BtydModel, ModelKind, PurchaseModel},
    },
};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

const TRANSACTION_PREFIX: &str = "gamma_tr_";
const DROPOUT_A_PREFIX: &str = "gamma_a_";
const DROPOUT_B_PREFIX: &str = "gamma_b_";

/// Covariate BG/NBD model descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaGeoCovariates;

/// Fitted covariate BG/NBD parameters.
///
/// - `gamma_transaction`: one coefficient per transaction covariate.
/// - `gamma_dropout_a`, `gamma_dropout_b`: one coefficient each per dropout
///   covariate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaGeoCovariateParams {
    pub r: f64,
    pub alpha0: f64,
    pub a0: f64,
    pub b0: f64,
    pub gamma_transaction: Array1<f64>,
    pub gamma_dropout_a: Array1<f64>,
    pub gamma_dropout_b: Array1<f64>,
}

impl BetaGeoCovariateParams {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidParams` for non-positive baselines or
    ///   non-finite coefficients.
    /// - `BtydError::ParamCountMismatch` if the two dropout coefficient
    ///   vectors differ in length.
    pub fn new(
        r: f64, alpha0: f64, a0: f64, b0: f64, gamma_transaction: Array1<f64>,
        gamma_dropout_a: Array1<f64>, gamma_dropout_b: Array1<f64>,
    ) -> BtydResult<Self> {
        if gamma_dropout_a.len() != gamma_dropout_b.len() {
            return Err(BtydError::ParamCountMismatch {
                expected: gamma_dropout_a.len(),
                found: gamma_dropout_b.len(),
            });
        }
        let coefficients = [
            (TRANSACTION_PREFIX, &gamma_transaction),
            (DROPOUT_A_PREFIX, &gamma_dropout_a),
            (DROPOUT_B_PREFIX, &gamma_dropout_b),
        ];
        for (prefix, values) in coefficients {
            for (k, &value) in values.iter().enumerate() {
                finite_param(&format!("{prefix}{k}"), value)?;
            }
        }
        Ok(Self {
            r: positive_param("r", r)?,
            alpha0: positive_param("alpha0", alpha0)?,
            a0: positive_param("a0", a0)?,
            b0: positive_param("b0", b0)?,
            gamma_transaction,
            gamma_dropout_a,
            gamma_dropout_b,
        })
    }

    /// Individual BG/NBD parameters for one covariate row pair.
    ///
    /// # Errors
    /// - `BtydError::CovariateWidth` if a row does not have the fitted
    ///   number of transaction or dropout covariates.
    pub fn for_subject(
        &self, transaction_row: ArrayView1<'_, f64>, dropout_row: ArrayView1<'_, f64>,
    ) -> BtydResult<BetaGeoParams> {
        self.check_widths(transaction_row.len(), dropout_row.len())?;
        Ok(self.individual(transaction_row, dropout_row))
    }

    /// Conditional expected purchases for every subject of `data`.
    ///
    /// # Errors
    /// - `BtydError::CovariateWidth` if `data` has other covariate counts
    ///   than the fitted coefficients.
    pub fn conditional_expected_number_of_purchases_batch(
        &self, t: f64, data: &CovariateData,
    ) -> BtydResult<Array1<f64>> {
        self.map_subjects(data, |params, (x, t_x, age)| {
            params.conditional_expected_number_of_purchases_up_to_time(t, x, t_x, age)
        })
    }

    /// Probability alive for every subject of `data`.
    ///
    /// # Errors
    /// - `BtydError::CovariateWidth` on a covariate count mismatch.
    pub fn conditional_probability_alive_batch(
        &self, data: &CovariateData,
    ) -> BtydResult<Array1<f64>> {
        self.map_subjects(data, |params, (x, t_x, age)| {
            params.conditional_probability_alive(x, t_x, age)
        })
    }

    /// Apply `f` to each subject's individual parameters and history.
    ///
    /// # Errors
    /// - `BtydError::CovariateWidth` if the covariate matrices of `data` do
    ///   not match the coefficient vectors; no subject is evaluated then.
    pub fn map_subjects<F>(&self, data: &CovariateData, f: F) -> BtydResult<Array1<f64>>
    where
        F: Fn(&BetaGeoParams, (f64, f64, f64)) -> f64,
    {
        self.check_widths(data.n_transaction_covariates(), data.n_dropout_covariates())?;
        Ok(data
            .summary
            .rows()
            .enumerate()
            .map(|(i, row)| {
                let params = self.individual(
                    data.transaction_covariates.row(i),
                    data.dropout_covariates.row(i),
                );
                f(&params, row)
            })
            .collect())
    }

    // ---- Helper methods ----

    fn check_widths(&self, n_transaction: usize, n_dropout: usize) -> BtydResult<()> {
        for (matrix, expected, found) in [
            ("transaction_covariates", self.gamma_transaction.len(), n_transaction),
            ("dropout_covariates", self.gamma_dropout_a.len(), n_dropout),
        ] {
            if found != expected {
                return Err(BtydError::CovariateWidth { matrix, expected, found });
            }
        }
        Ok(())
    }

    fn individual(
        &self, transaction_row: ArrayView1<'_, f64>, dropout_row: ArrayView1<'_, f64>,
    ) -> BetaGeoParams {
        BetaGeoParams {
            r: self.r,
            alpha: self.alpha0 * (-self.gamma_transaction.dot(&transaction_row)).exp(),
            a: self.a0 * self.gamma_dropout_a.dot(&dropout_row).exp(),
            b: self.b0 * self.gamma_dropout_b.dot(&dropout_row).exp(),
        }
    }
}

fn coefficient_names(prefix: &str, count: usize) -> impl Iterator<Item = String> + '_ {
    (0..count).map(move |k| format!("{prefix}{k}"))
}

impl ModelParams for BetaGeoCovariateParams {
    fn to_vector(&self) -> ParamVector {
        let mut pairs = vec![
            ("r".to_string(), self.r),
            ("alpha0".to_string(), self.alpha0),
            ("a0".to_string(), self.a0),
            ("b0".to_string(), self.b0),
        ];
        for (prefix, values) in [
            (TRANSACTION_PREFIX, &self.gamma_transaction),
            (DROPOUT_A_PREFIX, &self.gamma_dropout_a),
            (DROPOUT_B_PREFIX, &self.gamma_dropout_b),
        ] {
            pairs.extend(coefficient_names(prefix, values.len()).zip(values.iter().copied()));
        }
        ParamVector::from_pairs(pairs)
    }

    fn from_vector(vector: &ParamVector) -> BtydResult<Self> {
        let base = vector.unload(&["r", "alpha0", "a0", "b0"])?;
        let gamma_transaction = Array1::from(vector.values_with_prefix(TRANSACTION_PREFIX));
        let gamma_dropout_a = Array1::from(vector.values_with_prefix(DROPOUT_A_PREFIX));
        let gamma_dropout_b = Array1::from(vector.values_with_prefix(DROPOUT_B_PREFIX));
        let expected =
            4 + gamma_transaction.len() + gamma_dropout_a.len() + gamma_dropout_b.len();
        if vector.len() != expected {
            return Err(BtydError::ParamCountMismatch { expected, found: vector.len() });
        }
        Self::new(
            base[0],
            base[1],
            base[2],
            base[3],
            gamma_transaction,
            gamma_dropout_a,
            gamma_dropout_b,
        )
    }
}

impl BtydModel for BetaGeoCovariates {
    type Data = CovariateData;
    type Params = BetaGeoCovariateParams;

    const KIND: ModelKind = ModelKind::BetaGeoCovariates;

    fn param_specs(&self, data: &CovariateData) -> Vec<ParamSpec> {
        let mut specs = vec![
            ParamSpec::positive("r"),
            ParamSpec::time_scaled("alpha0"),
            ParamSpec::positive("a0"),
            ParamSpec::positive("b0"),
        ];
        let k_tr = data.n_transaction_covariates();
        let k_do = data.n_dropout_covariates();
        specs.extend(coefficient_names(TRANSACTION_PREFIX, k_tr).map(ParamSpec::unconstrained));
        specs.extend(coefficient_names(DROPOUT_A_PREFIX, k_do).map(ParamSpec::unconstrained));
        specs.extend(coefficient_names(DROPOUT_B_PREFIX, k_do).map(ParamSpec::unconstrained));
        specs
    }

    fn log_likelihood_terms(
        &self, params: &BetaGeoCovariateParams, data: &CovariateData,
    ) -> Array1<f64> {
        // Coefficients that do not match the data give NaN terms, which the
        // objective treats as an infeasible point.
        params
            .map_subjects(data, |individual, (x, t_x, age)| individual.log_likelihood(x, t_x, age))
            .unwrap_or_else(|_| Array1::from_elem(data.n_subjects(), f64::NAN))
    }
}
