//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait implemented by objectives (model × data × penalty).
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`LineSearcher`]: choice of line search used by L-BFGS.
//! - [`OptimOutcome`]: normalized result returned by [`maximize`](super::maximize).
//!
//! Convention: we *maximize* `ℓ(θ)` by minimizing the cost `c(θ) = -ℓ(θ)`. If an
//! analytic gradient is provided, it should be the gradient of `ℓ`; the adapter
//! flips the sign as needed.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Objective interface consumed by the optimizer.
///
/// - `type Data`: payload carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`. Values may be
///   non-finite; the solvers treat those points as infeasible.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook called once
///   before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   Without it, finite differences of the cost are used.
pub trait LogLikelihood {
    type Data;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parsing is case-insensitive (`"MoreThuente"`, `"HagerZhang"`); unknown
/// names return `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Default initial simplex edge (in θ units) for the Nelder–Mead fallback.
pub const DEFAULT_SIMPLEX_STEP: f64 = 0.25;

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols`: tolerances and iteration limits shared by both solvers.
/// - `line_searcher`: line search used by L-BFGS.
/// - `verbose`: attach a slog observer (behind the `obs_slog` feature).
/// - `lbfgs_mem`: L-BFGS history size, `None` for [`DEFAULT_LBFGS_MEM`](super::DEFAULT_LBFGS_MEM).
/// - `nelder_mead_fallback`: rerun with Nelder–Mead when L-BFGS fails.
/// - `simplex_step`: initial simplex edge for Nelder–Mead.
///
/// Default:
/// - `tols`: `tol_grad = 1e-7`, `tol_cost = 1e-12`, `max_iter = 2000`
/// - `line_searcher`: `MoreThuente`
/// - `nelder_mead_fallback`: `true`, `simplex_step`: `0.25`
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
    pub nelder_mead_fallback: bool,
    pub simplex_step: f64,
}

impl MLEOptions {
    /// Create validated optimizer options with the fallback enabled.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self {
            tols,
            line_searcher,
            verbose: false,
            lbfgs_mem,
            nelder_mead_fallback: true,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        })
    }

    /// Replace the Nelder–Mead settings.
    ///
    /// # Errors
    /// - [`OptError::InvalidSimplexStep`] if `simplex_step` is not finite and
    ///   strictly positive.
    pub fn with_fallback(mut self, enabled: bool, simplex_step: f64) -> OptResult<Self> {
        if !simplex_step.is_finite() || simplex_step <= 0.0 {
            return Err(OptError::InvalidSimplexStep {
                step: simplex_step,
                reason: "Simplex step must be finite and positive.",
            });
        }
        self.nelder_mead_fallback = enabled;
        self.simplex_step = simplex_step;
        Ok(self)
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-7), tol_cost: Some(1e-12), max_iter: Some(2000) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
            nelder_mead_fallback: true,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: L-BFGS stops when the gradient norm falls below this value.
/// - `tol_cost`: L-BFGS stops on a smaller cost change; Nelder–Mead uses it
///   as the simplex cost standard-deviation tolerance.
/// - `max_iter`: hard cap on the number of iterations.
///
/// At least one of the three must be provided (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best objective value `ℓ(θ̂)` (not the cost).
/// - `converged`: `true` when the solver met a convergence criterion; hitting
///   the iteration cap is reported as not converged.
/// - `status`: human-readable termination status.
/// - `solver`: name of the solver that produced the result.
/// - `iterations`, `fn_evals`: counters reported by argmin.
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub solver: &'static str,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        solver: &'static str, iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let converged = match &termination {
            TerminationStatus::NotTerminated => false,
            TerminationStatus::Terminated(reason) => {
                !matches!(reason, TerminationReason::MaxItersReached)
            }
        };
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            solver,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}
