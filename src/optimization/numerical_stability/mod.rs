//! numerical_stability — parameter links and covariance mapping.
//!
//! Purpose
//! -------
//! Keep the mapping between unconstrained optimizer coordinates and
//! model-space parameters in one place, together with the small numeric
//! tolerances shared by the optimizer and inference layers.
//!
//! Key behaviors
//! -------------
//! - [`ParamTransform`] links one θ coordinate to one model parameter
//!   (`exp`, identity, or `1 + exp`) and exposes its inverse and Jacobian.
//! - [`delta_method`] converts θ-space covariance into model-space
//!   covariance for a diagonal Jacobian.
//! - Shared tolerances: [`EIGEN_EPS`], [`GENERAL_TOL`], [`MAX_LOG_PARAM`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Every model parameter depends on exactly one θ coordinate, so the
//!   Jacobian is diagonal.
//! - `to_model` never returns `+∞` for finite input: log-parameters are
//!   clamped at [`MAX_LOG_PARAM`].
//!
//! Conventions
//! -----------
//! - Pure functions on `f64` and `ndarray` values; no logging or I/O.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover round trips, range guards,
//!   Jacobians against finite differences, and the delta-method product.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, GENERAL_TOL, MAX_LOG_PARAM, ParamTransform, delta_method,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::transformations::{EIGEN_EPS, ParamTransform, delta_method};
}
