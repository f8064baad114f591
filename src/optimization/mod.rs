//! optimization — MLE stack, parameter links, and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used by model fitting: an argmin-backed
//! log-likelihood maximizer, parameter transforms between optimizer and
//! model space, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer`: maximize `ℓ(θ)` with L-BFGS (More–Thuente or
//!   Hager–Zhang line search), finite-difference gradients, a Nelder–Mead
//!   fallback, and value-based finite-difference Hessians.
//! - `numerical_stability`: `ParamTransform` links, the delta method, and
//!   shared tolerances.
//! - `errors`: `OptError` / `OptResult<T>`, including conversions from
//!   argmin errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained space `θ`; invalid states are
//!   reported as `OptError`, never panics.
//! - Objectives may return non-finite values off their domain. L-BFGS
//!   treats these as errors (triggering the fallback); Nelder–Mead ranks
//!   them last.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; outcomes are
//!   reported on the `ℓ` scale.
//! - The only logging in this layer is the `warn!` emitted when the
//!   fallback solver takes over.
//!
//! Downstream usage
//! ----------------
//! - `btyd::fitter` implements `LogLikelihood` for a model/data pair and
//!   calls `maximize`; `inference` calls `compute_hessian` at the optimum.
//! - Front-ends can import the curated surface via
//!   `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests live in the submodules; end-to-end solves on toy
//!   objectives are in `loglik_optimizer::api`.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_btyd::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
