//! fitter — generic penalized maximum likelihood for every model.
//!
//! Purpose
//! -------
//! Turn any [`BtydModel`] plus validated data into a [`FitResult`]: rescale
//! time, map parameters to an unconstrained optimizer space, maximize the
//! mean penalized log-likelihood, map back, unscale and attach Hessian-based
//! diagnostics.
//!
//! Key behaviors
//! -------------
//! - Data are checked by the model before any optimizer work.
//! - Time columns are divided by the median age (see
//!   [`FitData::time_scale`]) for models that scale time; parameters flagged
//!   `time_scaled` are multiplied back by the same factor afterwards.
//! - The optimizer maximizes `-NLL(θ) / W`. Points where parameters cannot
//!   be built evaluate to `-∞`, which L-BFGS treats as infeasible and the
//!   Nelder–Mead fallback ranks last.
//! - `iterative_fitting > 1` adds starts jittered by seeded Normal noise in
//!   θ-space; the best objective wins.
//! - Non-convergence is a `warn!`, not an error. A singular or indefinite
//!   Hessian drops the diagnostics with a `warn!`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The reported `objective` is the penalized NLL on the rescaled data.
//! - The reported parameters are in the caller's time units; predictions
//!   never need the scale factor.
//!
//! Testing notes
//! -------------
//! - Unit tests cover input rejection and the infeasible-point convention.
//!   Recovery of reference estimates, scale invariance and shrinkage under
//!   the penalty are integration tests under `tests/`.
use crate::{
    btyd::{
        core::{
            data::FitData,
            fit_result::FitResult,
            options::FitOptions,
            params::{ModelParams, ParamSpec},
        },
        errors::{BtydError, BtydResult},
        models::traits::BtydModel,
    },
    inference::compute_diagnostics,
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{LogLikelihood, OptimOutcome, Theta, maximize},
    },
};
use log::{debug, info, warn};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

/// Mean penalized log-likelihood of a model, as seen by the optimizer.
///
/// `value(θ) = -NLL(p(θ)) / W` where `p(θ)` applies each spec's transform.
#[derive(Debug, Clone)]
pub struct PenalizedObjective<'a, M: BtydModel> {
    pub model: &'a M,
    pub specs: &'a [ParamSpec],
    pub penalizer: f64,
    pub total_weight: f64,
}

impl<M: BtydModel> PenalizedObjective<'_, M> {
    /// Model-space values for `θ`, in spec order.
    pub fn model_values(&self, theta: &Theta) -> Vec<f64> {
        self.specs.iter().zip(theta.iter()).map(|(spec, &t)| spec.transform.to_model(t)).collect()
    }

    /// `NLL(p(θ)) / W`; `+∞` where the parameters are not admissible.
    pub fn mean_nll(&self, theta: &Theta, data: &M::Data) -> f64 {
        match self.model.params_from_values(&self.model_values(theta), data) {
            Ok(params) => {
                self.model.negative_log_likelihood(&params, data, self.penalizer)
                    / self.total_weight
            }
            Err(_) => f64::INFINITY,
        }
    }
}

impl<M: BtydModel> LogLikelihood for PenalizedObjective<'_, M> {
    type Data = M::Data;

    fn value(&self, theta: &Theta, data: &M::Data) -> OptResult<f64> {
        Ok(-self.mean_nll(theta, data))
    }

    /// The starting point must match the layout and be feasible.
    fn check(&self, theta: &Theta, data: &M::Data) -> OptResult<()> {
        if theta.len() != self.specs.len() {
            return Err(OptError::InvalidParameter {
                text: format!("expected {} parameters, found {}", self.specs.len(), theta.len()),
            });
        }
        let value = self.value(theta, data)?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        Ok(())
    }
}

/// fit — penalized maximum-likelihood estimation of `model` on `data`.
///
/// Parameters
/// ----------
/// - `model`: `&M`
///   Model descriptor (for example `BetaGeo` or `GammaGamma::new(true)`).
/// - `data`: `&M::Data`
///   Validated training data in the caller's time units.
/// - `options`: `&FitOptions`
///   Penalizer, optimizer settings, restarts, starting values, confidence
///   level and whether to keep the data.
///
/// Returns
/// -------
/// `BtydResult<FitResult<M>>`
///   Parameters in the caller's units, objective, scale, optimizer report
///   and optional diagnostics.
///
/// Errors
/// ------
/// - Model-specific data errors from [`BtydModel::check_data`].
/// - `BtydError::ParamCountMismatch` / `BtydError::InvalidParams` for bad
///   `initial_params`.
/// - `BtydError::Optimization` when every start fails outright (for
///   example an infeasible starting point).
///
/// Notes
/// -----
/// - Hitting the iteration cap returns the best iterate with
///   `converged == false`.
pub fn fit<M: BtydModel>(
    model: &M, data: &M::Data, options: &FitOptions,
) -> BtydResult<FitResult<M>> {
    model.check_data(data)?;
    let n_subjects = data.n_subjects();
    if n_subjects == 0 {
        return Err(BtydError::EmptyData);
    }
    let scale = if model.scales_time() { data.time_scale() } else { 1.0 };
    let scaled = data.rescaled(scale);
    let specs = model.param_specs(&scaled);
    let theta0 = initial_theta(model, &specs, &scaled, scale, options)?;

    let total_weight = scaled.total_weight();
    let objective =
        PenalizedObjective { model, specs: &specs, penalizer: options.penalizer, total_weight };
    let outcome = best_of_starts(&objective, theta0, &scaled, options)?;
    if !outcome.converged {
        warn!(
            "{} fit did not converge after {} iterations ({}); returning the best iterate",
            model.kind(),
            outcome.iterations,
            outcome.status
        );
    }

    let values: Vec<f64> = objective
        .model_values(&outcome.theta_hat)
        .into_iter()
        .zip(specs.iter())
        .map(|(value, spec)| if spec.time_scaled { value * scale } else { value })
        .collect();
    let params = model.params_from_values(&values, data)?;
    let estimates = Array1::from(values);
    let jacobian: Array1<f64> =
        specs.iter().zip(estimates.iter()).map(|(spec, &v)| spec.transform.jacobian_at(v)).collect();
    let mean_nll = |theta: &Theta| objective.mean_nll(theta, &scaled);
    let diagnostics = match compute_diagnostics(
        &mean_nll,
        &outcome.theta_hat,
        total_weight,
        &estimates,
        &jacobian,
        options.confidence_level,
    ) {
        Ok(diagnostics) => Some(diagnostics),
        Err(err) => {
            warn!("{} covariance unavailable: {err}", model.kind());
            None
        }
    };

    let result = FitResult {
        model: model.clone(),
        vector: params.to_vector(),
        params,
        objective: -outcome.value * total_weight,
        scale,
        penalizer: options.penalizer,
        n_subjects,
        converged: outcome.converged,
        iterations: outcome.iterations,
        status: outcome.status,
        solver: outcome.solver.to_string(),
        diagnostics,
        data: options.keep_data.then(|| data.clone()),
    };
    info!("{result} (objective {:.6}, scale {:.6})", result.objective, scale);
    Ok(result)
}

// ---- Helper methods ----

/// Starting θ from user values (caller units) or the model's defaults
/// (rescaled units).
fn initial_theta<M: BtydModel>(
    model: &M, specs: &[ParamSpec], scaled: &M::Data, scale: f64, options: &FitOptions,
) -> BtydResult<Theta> {
    let values: Vec<f64> = match &options.initial_params {
        Some(values) => {
            if values.len() != specs.len() {
                return Err(BtydError::ParamCountMismatch {
                    expected: specs.len(),
                    found: values.len(),
                });
            }
            values
                .iter()
                .zip(specs.iter())
                .map(|(&v, spec)| if spec.time_scaled { v / scale } else { v })
                .collect()
        }
        None => model.initial_values(scaled),
    };
    specs
        .iter()
        .zip(values.iter())
        .map(|(spec, &value)| {
            spec.transform.to_theta(value).ok_or_else(|| BtydError::InvalidParams {
                name: spec.name.clone(),
                value,
                reason: "outside the parameter's domain",
            })
        })
        .collect()
}

/// Run the configured number of starts and keep the highest objective.
///
/// The first start uses `theta0` as given. A failed start is skipped; if
/// every start fails, the first error is returned.
fn best_of_starts<M: BtydModel>(
    objective: &PenalizedObjective<'_, M>, theta0: Theta, data: &M::Data, options: &FitOptions,
) -> BtydResult<OptimOutcome> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut best: Option<OptimOutcome> = None;
    let mut first_err: Option<OptError> = None;
    for start in 0..options.iterative_fitting {
        let theta = if start == 0 {
            theta0.clone()
        } else {
            theta0.mapv(|t| t + options.restart_jitter * rng.sample::<f64, _>(StandardNormal))
        };
        match maximize(objective, theta, data, &options.mle) {
            Ok(outcome) => {
                debug!(
                    "start {}/{}: objective {:.6}, converged {}",
                    start + 1,
                    options.iterative_fitting,
                    -outcome.value * objective.total_weight,
                    outcome.converged
                );
                if best.as_ref().is_none_or(|b| outcome.value > b.value) {
                    best = Some(outcome);
                }
            }
            Err(err) => {
                debug!("start {}/{} failed: {err}", start + 1, options.iterative_fitting);
                first_err.get_or_insert(err);
            }
        }
    }
    match (best, first_err) {
        (Some(outcome), _) => Ok(outcome),
        (None, Some(err)) => Err(err.into()),
        (None, None) => Err(BtydError::Optimization(OptError::UnknownError)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btyd::{
        core::data::{MonetaryData, SummaryData},
        models::{beta_geo::BetaGeo, gamma_gamma::GammaGamma},
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Input rejection before optimization.
    // - The infeasible-point convention of the objective.
    // - Mapping of user starting values into θ-space.
    // -------------------------------------------------------------------------

    fn summary() -> SummaryData {
        SummaryData::new(
            array![0.0, 1.0, 4.0, 2.0, 0.0, 7.0],
            array![0.0, 5.0, 30.0, 12.0, 0.0, 35.0],
            array![38.0, 38.0, 38.0, 20.0, 15.0, 39.0],
            None,
        )
        .expect("valid data")
    }

    #[test]
    // Purpose
    // -------
    // Malformed starting values fail before any optimizer work.
    //
    // Given
    // -----
    // - Three starting values for a four-parameter model; a negative `r`.
    //
    // Expect
    // ------
    // - `ParamCountMismatch` and `InvalidParams { name: "r" }`.
    fn bad_initial_params_are_rejected() {
        let data = summary();
        let short = FitOptions::default().with_initial_params(vec![1.0, 1.0, 1.0]).expect("finite");
        assert_eq!(
            fit(&BetaGeo, &data, &short).unwrap_err(),
            BtydError::ParamCountMismatch { expected: 4, found: 3 }
        );
        let negative =
            FitOptions::default().with_initial_params(vec![-1.0, 1.0, 1.0, 1.0]).expect("finite");
        assert!(matches!(
            fit(&BetaGeo, &data, &negative),
            Err(BtydError::InvalidParams { ref name, .. }) if name == "r"
        ));
    }

    #[test]
    // Purpose
    // -------
    // Model data checks run first: spend models refuse one-time buyers.
    //
    // Given
    // -----
    // - Monetary data with a zero frequency.
    //
    // Expect
    // ------
    // - `InvalidObservation` from the model check.
    fn model_data_checks_run_first() {
        let data = MonetaryData::new(array![0.0, 3.0], array![10.0, 20.0], None).expect("valid");
        assert!(matches!(
            fit(&GammaGamma::default(), &data, &FitOptions::default()),
            Err(BtydError::InvalidObservation { column: "frequency", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The objective is the negated mean NLL, and matches the model's own
    // NLL at the same parameters.
    //
    // Given
    // -----
    // - θ = ln(0.5, 2.0, 0.7, 3.0) on a small data set.
    //
    // Expect
    // ------
    // - `value(θ) · W = -NLL(p)`; `check` accepts θ and rejects a shorter θ.
    fn objective_matches_model_nll() {
        // Arrange
        let data = summary();
        let specs = BetaGeo.param_specs(&data);
        let objective =
            PenalizedObjective { model: &BetaGeo, specs: &specs, penalizer: 0.0, total_weight: 6.0 };
        let theta = array![0.5_f64.ln(), 2.0_f64.ln(), 0.7_f64.ln(), 3.0_f64.ln()];

        // Act
        let value = objective.value(&theta, &data).expect("evaluates");
        let params =
            BetaGeo.params_from_values(&objective.model_values(&theta), &data).expect("valid");
        let nll = BetaGeo.negative_log_likelihood(&params, &data, 0.0);

        // Assert
        assert!((value * 6.0 + nll).abs() < 1e-9);
        assert!(objective.check(&theta, &data).is_ok());
        assert!(objective.check(&array![0.0, 0.0], &data).is_err());
    }
}
