//! loglik_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used by the optimizer so
//! the rest of the crate stays agnostic to `ndarray` and argmin generics.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` are column vectors with one entry per free parameter.
//! - `Hessian` is dense and square, `theta.len() × theta.len()`.
//! - `Cost` is the scalar minimized by argmin, `c(θ) = -ℓ(θ)`.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` in unconstrained optimizer space.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as `Theta`.
pub type Grad = Array1<f64>;

/// Dense Hessian matrix, `n × n` for `n = Theta.len()`.
pub type Hessian = Array2<f64>;

/// Scalar objective value handed to argmin.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver
/// (e.g. `"cost_count"`, `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search specialized to this crate’s numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate’s numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// Derivative-free simplex solver used as the fallback path.
pub type NelderMeadSolver = NelderMead<Theta, Cost>;
