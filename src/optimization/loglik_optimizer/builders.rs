//! loglik_optimizer::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Build the argmin solvers used by [`maximize`](super::maximize) from an
//! [`MLEOptions`] value, so the runner layer never touches argmin generics.
//!
//! Key behaviors
//! -------------
//! - L-BFGS with either Hager–Zhang or More–Thuente line search, with optional
//!   gradient and cost-change tolerances applied by [`configure_lbfgs`].
//! - Nelder–Mead with an axis-aligned initial simplex around `θ₀` and the
//!   cost tolerance reused as the simplex standard-deviation tolerance.
//!
//! Invariants & assumptions
//! ------------------------
//! - The L-BFGS memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - The simplex has `n + 1` vertices: `θ₀` and `θ₀ + step · e_i` for each
//!   coordinate `i`.
//! - Argmin rejections of tolerances surface as `OptError` through the
//!   crate's `From<argmin::core::Error>` conversion.
//!
//! Conventions
//! -----------
//! - Builders never set `max_iters`; iteration caps are applied by the
//!   runners in [`run`](super::run).
//!
//! Testing notes
//! -------------
//! - Unit tests check construction under default and explicit settings and
//!   the simplex geometry. Full solves are covered in `api`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, NelderMeadSolver, Theta,
        },
    },
};

/// build_optimizer_hager_zhang — L-BFGS with Hager–Zhang line search.
///
/// Parameters
/// ----------
/// - `opts`: `&MLEOptions`
///   Source of `lbfgs_mem`, `tols.tol_grad` and `tols.tol_cost`.
///
/// Returns
/// -------
/// `OptResult<LbfgsHagerZhang>`
///   A configured solver without initial parameters.
///
/// Errors
/// ------
/// - `OptError` when argmin rejects a tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// build_optimizer_more_thuente — L-BFGS with More–Thuente line search.
///
/// Same contract as [`build_optimizer_hager_zhang`]; this is the default
/// line search for model fitting.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances to an L-BFGS
/// solver, whatever its line search. `None` leaves argmin's default.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// build_nelder_mead — derivative-free simplex solver around `θ₀`.
///
/// Parameters
/// ----------
/// - `theta0`: `&Theta`
///   Anchor vertex of the initial simplex.
/// - `opts`: `&MLEOptions`
///   Source of `simplex_step` and `tols.tol_cost` (used as the simplex
///   standard-deviation tolerance when present).
///
/// Returns
/// -------
/// `OptResult<NelderMeadSolver>`
///
/// Errors
/// ------
/// - `OptError` when argmin rejects the tolerance.
pub fn build_nelder_mead(theta0: &Theta, opts: &MLEOptions) -> OptResult<NelderMeadSolver> {
    let solver = NelderMeadSolver::new(initial_simplex(theta0, opts.simplex_step));
    match opts.tols.tol_cost {
        Some(tol) => Ok(solver.with_sd_tolerance(tol)?),
        None => Ok(solver),
    }
}

// ---- Helper methods ----

fn initial_simplex(theta0: &Theta, step: f64) -> Vec<Theta> {
    let mut vertices = Vec::with_capacity(theta0.len() + 1);
    vertices.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut vertex = theta0.clone();
        vertex[i] += step;
        vertices.push(vertex);
    }
    vertices
}
