//! Execution helpers that run an argmin solver on a log-likelihood problem and
//! return a crate-friendly [`OptimOutcome`].
//!
//! - [`run_lbfgs`]: gradient-based runs through [`ArgMinAdapter`].
//! - [`run_nelder_mead`]: derivative-free runs through [`SimplexAdapter`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta,
        adapter::{ArgMinAdapter, SimplexAdapter},
        types::NelderMeadSolver,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, IterState, Solver, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an L-BFGS solver (either line search) for a log-likelihood problem.
///
/// # Type Parameters
/// - `F`: the objective implementing [`LogLikelihood`].
/// - `S`: an argmin solver over `ArgMinAdapter<'a, F>` whose state carries
///   `Theta` parameters and `Grad` gradients.
///
/// # Arguments
/// - `theta0`: initial parameter vector, consumed into the solver state.
/// - `opts`: iteration cap and verbosity.
/// - `problem`: the adapted objective.
/// - `solver`: a solver from [`builders`](super::builders).
///
/// # Feature flags
/// With `obs_slog` enabled and `opts.verbose == true`, a terminal slog
/// observer is attached and ℓ(θ₀) is logged before the first iteration.
///
/// # Returns
/// An [`OptimOutcome`] tagged with solver name `"L-BFGS"`.
///
/// # Errors
/// - argmin runtime errors (line-search failures, non-finite costs) via the
///   crate's `From<argmin::core::Error>` conversion.
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }
    let mut state = optimizer.run()?.state().clone();
    let grad = state.take_gradient();
    into_outcome(state, "L-BFGS", grad)
}

/// Run Nelder–Mead for a log-likelihood problem.
///
/// The simplex already encodes the starting point, so no initial parameter
/// is set on the state. Non-finite objective values are ranked as `+∞` by
/// [`SimplexAdapter`] and never abort the run.
///
/// # Returns
/// An [`OptimOutcome`] tagged with solver name `"Nelder-Mead"` and no
/// gradient norm.
///
/// # Errors
/// - argmin runtime errors and outcome validation errors, as for
///   [`run_lbfgs`]. A best cost of `+∞` (no feasible vertex ever found)
///   fails validation with `NonFiniteCost`.
pub fn run_nelder_mead<F: LogLikelihood>(
    opts: &MLEOptions, problem: SimplexAdapter<'_, F>, solver: NelderMeadSolver,
) -> OptResult<OptimOutcome> {
    let mut optimizer = Executor::new(problem, solver);
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }
    let state = optimizer.run()?.state().clone();
    into_outcome(state, "Nelder-Mead", None)
}

// ---- Helper Methods ----

/// Convert a final solver state (costs are `-ℓ`) into an [`OptimOutcome`].
fn into_outcome<G>(
    mut state: IterState<Theta, G, (), (), (), f64>, solver: &'static str, grad: Option<Grad>,
) -> OptResult<OptimOutcome>
where
    IterState<Theta, G, (), (), (), f64>: State<Param = Theta, Float = f64>,
{
    let iterations = state.get_iter();
    let fn_evals = state.get_func_counts().clone();
    let termination = state.get_termination_status().clone();
    OptimOutcome::new(
        state.take_best_param(),
        -state.get_best_cost(),
        termination,
        solver,
        iterations,
        fn_evals,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    log::info!(
        "init: ell(theta0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
