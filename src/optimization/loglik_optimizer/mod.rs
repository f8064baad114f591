//! loglik_optimizer — argmin-powered log-likelihood maximization.
//!
//! Purpose
//! -------
//! Provide a small optimization layer for **maximizing log-likelihoods**
//! `ℓ(θ)`. Callers implement [`LogLikelihood`] and invoke [`maximize`] to run
//! L-BFGS with a configurable line search, finite-difference gradients and a
//! Nelder–Mead fallback.
//!
//! Key behaviors
//! -------------
//! - Convert `ℓ(θ)` into argmin cost functions `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`] (strict) and [`adapter::SimplexAdapter`]
//!   (non-finite values ranked as `+∞`).
//! - [`maximize`] validates `θ₀`, runs L-BFGS and, on failure, optionally
//!   reruns with Nelder–Mead, normalizing either result into an
//!   [`OptimOutcome`].
//! - [`finite_diff`] supplies gradients for the adapter and value-based
//!   Hessians for the inference layer.
//!
//! Invariants & assumptions
//! ------------------------
//! - User code implements `ℓ(θ)` and optionally `∇ℓ(θ)`, never the cost.
//! - Configuration types ([`Tolerances`], [`MLEOptions`]) are validated on
//!   construction.
//! - Reaching `max_iter` yields `converged == false`, not an error.
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained space as [`Theta`]. Mapping to a
//!   constrained model space happens in the model layer.
//! - [`OptimOutcome::value`] is reported on the `ℓ` scale.
//!
//! Testing notes
//! -------------
//! - Submodule tests cover sign conventions ([`adapter`]), solver wiring
//!   ([`builders`]), derivative approximations ([`finite_diff`]), validators
//!   ([`validation`]), option rules ([`traits`]) and end-to-end solves with
//!   the fallback ([`api`]).

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::finite_diff::compute_hessian;
pub use self::traits::{
    DEFAULT_SIMPLEX_STEP, LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Hessian, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_btyd::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
