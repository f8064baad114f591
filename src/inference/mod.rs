//! inference — post-estimation uncertainty for fitted models.
//!
//! Purpose
//! -------
//! Provide the covariance, standard errors and confidence intervals that
//! accompany a fitted parameter vector.
//!
//! Key behaviors
//! -------------
//! - Define [`InferenceError`] and [`InferenceResult`] for inference
//!   failures (singular curvature, invalid levels, shape mismatches).
//! - Build [`Diagnostics`] from a fitted objective with
//!   [`compute_diagnostics`]: finite-difference Hessian, eigen inverse,
//!   delta method to model space, normal intervals.
//!
//! Invariants & assumptions
//! ------------------------
//! - Hessians are taken of the mean objective in optimizer space and scaled
//!   by the total subject weight before inversion.
//! - A singular or indefinite Hessian is reported as an error; the fitter
//!   turns it into a warning and omits diagnostics.
//!
//! Downstream usage
//! ----------------
//! - `btyd::fitter` calls [`compute_diagnostics`] after each fit unless the
//!   caller opts out.
//!
//! Testing notes
//! -------------
//! - Unit tests live in [`hessian`] and [`errors`].

pub mod errors;
pub mod hessian;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{
    DEFAULT_CONFIDENCE_LEVEL, Diagnostics, compute_diagnostics, confidence_intervals,
    covariance_from_hessian, normal_quantile, standard_errors,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::{Diagnostics, compute_diagnostics};
}
