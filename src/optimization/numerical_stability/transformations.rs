//! Numerical stability utilities.
//!
//! Parameter transforms between the unconstrained optimizer space `θ` and
//! model space, plus the delta-method covariance map that goes with them.
//!
//! # Provided items
//! - [`ParamTransform`]: per-parameter link (`exp`, identity, `1 + exp`).
//! - [`MAX_LOG_PARAM`]: symmetric clamp applied to log-parameters before `exp`.
//! - [`EIGEN_EPS`]: relative eigenvalue floor used for singularity checks.
//! - [`GENERAL_TOL`]: generic tolerance for float comparisons.
//! - [`delta_method`]: `J Σ_θ Jᵀ` for a diagonal Jacobian.
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Bound on log-parameters passed to `exp`; outside `±MAX_LOG_PARAM` the
/// result would overflow to `+∞` or underflow to zero.
pub const MAX_LOG_PARAM: f64 = 700.0;

/// Relative eigenvalue floor: a symmetric matrix whose smallest eigenvalue
/// is below `EIGEN_EPS · λ_max` is treated as singular.
pub const EIGEN_EPS: f64 = 1e-6;

/// Generic absolute tolerance for float comparisons.
pub const GENERAL_TOL: f64 = 1e-10;

/// Link between one optimizer coordinate `θ` and one model parameter `p`.
///
/// - `Positive`: `p = exp(θ)` for strictly positive shape/rate parameters.
/// - `Unconstrained`: `p = θ` for regression coefficients.
/// - `ShiftedPositive`: `p = 1 + exp(θ)` for parameters constrained to
///   `(1, ∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamTransform {
    Positive,
    Unconstrained,
    ShiftedPositive,
}

impl ParamTransform {
    /// Map an optimizer coordinate into model space.
    pub fn to_model(self, theta: f64) -> f64 {
        match self {
            ParamTransform::Positive => theta.clamp(-MAX_LOG_PARAM, MAX_LOG_PARAM).exp(),
            ParamTransform::Unconstrained => theta,
            ParamTransform::ShiftedPositive => 1.0 + theta.clamp(-MAX_LOG_PARAM, MAX_LOG_PARAM).exp(),
        }
    }

    /// Map a model-space value back into optimizer space.
    ///
    /// Returns `None` when `value` lies outside the transform's range
    /// (non-positive for `Positive`, `≤ 1` for `ShiftedPositive`) or is not
    /// finite.
    pub fn to_theta(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match self {
            ParamTransform::Positive if value > 0.0 => Some(value.ln()),
            ParamTransform::Unconstrained => Some(value),
            ParamTransform::ShiftedPositive if value > 1.0 => Some((value - 1.0).ln()),
            _ => None,
        }
    }

    /// Derivative `dp/dθ` expressed through the model-space value `p`.
    ///
    /// For `Positive` this is `p` itself, which stays correct when `p` has
    /// been multiplied by a constant time scale after fitting.
    pub fn jacobian_at(self, value: f64) -> f64 {
        match self {
            ParamTransform::Positive => value,
            ParamTransform::Unconstrained => 1.0,
            ParamTransform::ShiftedPositive => value - 1.0,
        }
    }
}

/// Delta-method covariance for a coordinate-wise reparameterization.
///
/// Given `Σ_θ` and the diagonal Jacobian `J = diag(dp_i/dθ_i)`, returns
/// `Σ_p = J Σ_θ J`, i.e. `Σ_p[i, j] = J_i · Σ_θ[i, j] · J_j`.
///
/// # Panics
/// Indexes out of bounds if `jacobian.len()` is smaller than the matrix
/// dimension; callers build both from the same parameter list.
pub fn delta_method(cov_theta: &Array2<f64>, jacobian: &Array1<f64>) -> Array2<f64> {
    let mut out = cov_theta.clone();
    for ((i, j), v) in out.indexed_iter_mut() {
        *v *= jacobian[i] * jacobian[j];
    }
    out
}
