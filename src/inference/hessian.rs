//! inference::hessian — covariance, standard errors and confidence intervals.
//!
//! Purpose
//! -------
//! Turn the curvature of a fitted objective into parameter uncertainty:
//! a finite-difference Hessian in optimizer space is inverted into a
//! covariance matrix, mapped to model space with the delta method, and
//! summarized as standard errors and normal confidence intervals.
//!
//! Key behaviors
//! -------------
//! - [`covariance_from_hessian`]: `Σ_θ = (W · H)⁻¹` through a symmetric
//!   eigendecomposition, rejecting singular or indefinite `H`.
//! - [`standard_errors`]: square roots of the covariance diagonal.
//! - [`normal_quantile`] and [`confidence_intervals`]: two-sided normal
//!   intervals `p ± z · se`.
//! - [`compute_diagnostics`]: the whole chain for a fitted objective.
//!
//! Invariants & assumptions
//! ------------------------
//! - `H` is the Hessian of the **mean** penalized negative log-likelihood
//!   (the optimizer cost divided by the total weight `W`), so `W · H` is
//!   the observed information of the summed objective.
//! - A Hessian counts as singular when `λ_max ≤ 0` or
//!   `λ_min ≤ EIGEN_EPS · λ_max`. Singular curvature is an error here;
//!   callers decide whether to drop diagnostics.
//! - The model-space Jacobian is diagonal (one θ coordinate per parameter).
//!
//! Conventions
//! -----------
//! - `ndarray` in and out; `nalgebra::DMatrix` only for the eigen solve.
//! - Confidence intervals are returned as a `k × 2` matrix of
//!   `[lower, upper]` rows in parameter order.
//!
//! Testing notes
//! -------------
//! - Unit tests cover analytic inverses of diagonal and correlated
//!   matrices, the singular and indefinite rejections, the 95% quantile,
//!   and the full chain on a quadratic objective with a log link.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::{
        loglik_optimizer::{Theta, finite_diff::compute_hessian, types::Hessian},
        numerical_stability::transformations::{EIGEN_EPS, delta_method},
    },
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Default two-sided confidence level for reported intervals.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Uncertainty summary of a fitted parameter vector, in model space.
///
/// - `covariance`: `k × k` delta-method covariance.
/// - `standard_errors`: length-`k` square roots of its diagonal.
/// - `confidence_intervals`: `k × 2` rows of `[lower, upper]`.
/// - `confidence_level`: the level the intervals were built for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub covariance: Array2<f64>,
    pub standard_errors: Array1<f64>,
    pub confidence_intervals: Array2<f64>,
    pub confidence_level: f64,
}

/// compute_diagnostics — uncertainty summary at an optimum.
///
/// Parameters
/// ----------
/// - `objective`: `&F`
///   Mean penalized negative log-likelihood `θ ↦ NLL(θ) / W`.
/// - `theta_hat`: `&Theta`
///   Optimum in optimizer space.
/// - `total_weight`: `f64`
///   `W`, the sum of subject weights.
/// - `estimates`: `&Array1<f64>`
///   Model-space parameters reported to the caller, in θ order.
/// - `jacobian`: `&Array1<f64>`
///   Diagonal of `dp/dθ` at the optimum, in θ order.
/// - `level`: `f64`
///   Two-sided confidence level in `(0, 1)`.
///
/// Returns
/// -------
/// `InferenceResult<Diagnostics>`
///
/// Errors
/// ------
/// - `InferenceError::Opt` if the Hessian cannot be approximated.
/// - `InferenceError::SingularHessian` for singular or indefinite curvature.
/// - `InferenceError::DimMismatch` if `estimates` or `jacobian` do not match
///   `theta_hat`.
/// - `InferenceError::InvalidConfidenceLevel` for a level outside `(0, 1)`.
pub fn compute_diagnostics<F: Fn(&Theta) -> f64>(
    objective: &F, theta_hat: &Theta, total_weight: f64, estimates: &Array1<f64>,
    jacobian: &Array1<f64>, level: f64,
) -> InferenceResult<Diagnostics> {
    let k = theta_hat.len();
    for found in [estimates.len(), jacobian.len()] {
        if found != k {
            return Err(InferenceError::DimMismatch { expected: k, found });
        }
    }
    let z = normal_quantile(level)?;
    let hessian = compute_hessian(objective, theta_hat)?;
    let cov_theta = covariance_from_hessian(&hessian, total_weight)?;
    let covariance = delta_method(&cov_theta, jacobian);
    let standard_errors = standard_errors(&covariance)?;
    let confidence_intervals = intervals_with_quantile(estimates, &standard_errors, z);
    Ok(Diagnostics { covariance, standard_errors, confidence_intervals, confidence_level: level })
}

/// covariance_from_hessian — `(W · H)⁻¹` for a positive definite `H`.
///
/// Parameters
/// ----------
/// - `hessian`: `&Hessian`
///   Symmetric `k × k` Hessian of the mean objective.
/// - `total_weight`: `f64`
///   Multiplier `W` turning the mean objective into the summed one.
///
/// Returns
/// -------
/// `InferenceResult<Array2<f64>>`
///   The symmetric inverse `Q diag(1 / (W λ)) Qᵀ`.
///
/// Errors
/// ------
/// - `InferenceError::SingularHessian` when `λ_max ≤ 0` or
///   `λ_min ≤ EIGEN_EPS · λ_max`, or when `W` is not positive.
/// - `InferenceError::DimMismatch` for a non-square input.
pub fn covariance_from_hessian(
    hessian: &Hessian, total_weight: f64,
) -> InferenceResult<Array2<f64>> {
    let k = hessian.nrows();
    if hessian.ncols() != k {
        return Err(InferenceError::DimMismatch { expected: k, found: hessian.ncols() });
    }
    let info = DMatrix::<f64>::from_fn(k, k, |i, j| total_weight * hessian[[i, j]]);
    let eigen = info.symmetric_eigen();
    let max_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if !(max_eigenvalue > 0.0) || !(min_eigenvalue > EIGEN_EPS * max_eigenvalue) {
        return Err(InferenceError::SingularHessian { min_eigenvalue, max_eigenvalue });
    }
    let q = &eigen.eigenvectors;
    let mut cov = Array2::<f64>::zeros((k, k));
    for i in 0..k {
        for j in 0..=i {
            let value: f64 =
                eigen.eigenvalues.iter().enumerate().map(|(m, &l)| q[(i, m)] * q[(j, m)] / l).sum();
            cov[[i, j]] = value;
            cov[[j, i]] = value;
        }
    }
    Ok(cov)
}

/// Square roots of the covariance diagonal.
///
/// # Errors
/// [`InferenceError::NonFiniteVariance`] for a negative or non-finite
/// variance.
pub fn standard_errors(covariance: &Array2<f64>) -> InferenceResult<Array1<f64>> {
    let diag = covariance.diag();
    let mut se = Array1::<f64>::zeros(diag.len());
    for (index, &value) in diag.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(InferenceError::NonFiniteVariance { index, value });
        }
        se[index] = value.sqrt();
    }
    Ok(se)
}

/// Two-sided standard-normal quantile `z = Φ⁻¹((1 + level) / 2)`.
///
/// # Errors
/// [`InferenceError::InvalidConfidenceLevel`] unless `0 < level < 1`.
pub fn normal_quantile(level: f64) -> InferenceResult<f64> {
    if !level.is_finite() || level <= 0.0 || level >= 1.0 {
        return Err(InferenceError::InvalidConfidenceLevel {
            level,
            reason: "Confidence level must lie strictly between 0 and 1.",
        });
    }
    let std_normal = Normal::new(0.0, 1.0).map_err(|_| InferenceError::InvalidConfidenceLevel {
        level,
        reason: "Standard normal distribution unavailable.",
    })?;
    Ok(std_normal.inverse_cdf(0.5 * (1.0 + level)))
}

/// Normal confidence intervals `estimate ± z · se` as a `k × 2` matrix.
///
/// # Errors
/// - [`InferenceError::InvalidConfidenceLevel`] for a level outside `(0, 1)`.
/// - [`InferenceError::DimMismatch`] if the two vectors differ in length.
pub fn confidence_intervals(
    estimates: &Array1<f64>, standard_errors: &Array1<f64>, level: f64,
) -> InferenceResult<Array2<f64>> {
    if estimates.len() != standard_errors.len() {
        return Err(InferenceError::DimMismatch {
            expected: estimates.len(),
            found: standard_errors.len(),
        });
    }
    let z = normal_quantile(level)?;
    Ok(intervals_with_quantile(estimates, standard_errors, z))
}

// ---- Helper methods ----

fn intervals_with_quantile(estimates: &Array1<f64>, se: &Array1<f64>, z: f64) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((estimates.len(), 2));
    for (i, (&p, &s)) in estimates.iter().zip(se.iter()).enumerate() {
        out[[i, 0]] = p - z * s;
        out[[i, 1]] = p + z * s;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Inversion of positive definite Hessians, with and without correlation.
    // - Singular and indefinite rejections.
    // - Normal quantiles and interval construction.
    // - The full diagnostics chain on a quadratic objective.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The covariance of a correlated 2×2 Hessian equals its analytic inverse
    // divided by the weight.
    //
    // Given
    // -----
    // - H = [[2, 1], [1, 2]], W = 4.
    //
    // Expect
    // ------
    // - (W H)⁻¹ = [[2, -1], [-1, 2]] / 12.
    fn covariance_matches_analytic_inverse() {
        // Arrange
        let h = array![[2.0, 1.0], [1.0, 2.0]];

        // Act
        let cov = covariance_from_hessian(&h, 4.0).expect("positive definite");

        // Assert
        assert_abs_diff_eq!(cov[[0, 0]], 2.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[0, 1]], -1.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[1, 1]], 2.0 / 12.0, epsilon = 1e-12);
        assert_eq!(cov[[0, 1]], cov[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // Singular and indefinite matrices are rejected.
    //
    // Given
    // -----
    // - A rank-one matrix of ones and diag(1, -1).
    //
    // Expect
    // ------
    // - `SingularHessian` in both cases.
    fn singular_and_indefinite_hessians_are_rejected() {
        let rank_one = Array2::<f64>::ones((2, 2));
        let indefinite = array![[1.0, 0.0], [0.0, -1.0]];
        assert!(matches!(
            covariance_from_hessian(&rank_one, 1.0),
            Err(InferenceError::SingularHessian { .. })
        ));
        assert!(matches!(
            covariance_from_hessian(&indefinite, 1.0),
            Err(InferenceError::SingularHessian { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The 95% quantile is 1.959964 and intervals are symmetric around the
    // estimate.
    //
    // Given
    // -----
    // - estimates (1, 2), standard errors (0.1, 0.5), level 0.95.
    //
    // Expect
    // ------
    // - Half-widths 0.196 and 0.980; invalid levels rejected.
    fn normal_intervals_use_two_sided_quantile() {
        // Arrange
        let estimates = array![1.0, 2.0];
        let se = array![0.1, 0.5];

        // Act
        let z = normal_quantile(0.95).expect("valid level");
        let ci = confidence_intervals(&estimates, &se, 0.95).expect("valid inputs");

        // Assert
        assert_abs_diff_eq!(z, 1.959_963_984_540_054, epsilon = 1e-8);
        assert_abs_diff_eq!(ci[[0, 1]] - ci[[0, 0]], 2.0 * z * 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(ci[[1, 0]], 2.0 - z * 0.5, epsilon = 1e-12);
        assert!(normal_quantile(1.0).is_err());
        assert!(normal_quantile(0.0).is_err());
    }

    #[test]
    // Purpose
    // -------
    // The full chain reproduces the analytic delta-method standard error.
    //
    // Given
    // -----
    // - Mean objective c(θ) = (θ - ln 2)² / 2 (unit curvature), W = 100,
    //   log link p = exp(θ) with θ̂ = ln 2.
    //
    // Expect
    // ------
    // - se(p) = p · sqrt(1 / 100) = 0.2.
    fn diagnostics_apply_delta_method_through_log_link() {
        // Arrange
        let theta_hat = array![2.0_f64.ln()];
        let objective = |t: &Theta| 0.5 * (t[0] - 2.0_f64.ln()).powi(2);
        let estimates = array![2.0];
        let jacobian = array![2.0];

        // Act
        let diag = compute_diagnostics(&objective, &theta_hat, 100.0, &estimates, &jacobian, 0.9)
            .expect("positive curvature");

        // Assert
        assert_abs_diff_eq!(diag.standard_errors[0], 0.2, epsilon = 1e-5);
        assert_eq!(diag.confidence_level, 0.9);
        assert!(diag.confidence_intervals[[0, 0]] < 2.0 && diag.confidence_intervals[[0, 1]] > 2.0);
    }
}
