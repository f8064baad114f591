//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Supply derivative approximations around a parameter vector so that the
//! optimizer and the inference layer never depend on analytic derivatives of
//! the model likelihoods.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient with error capture and
//!   validation (the retry path of the argmin adapter).
//! - [`compute_hessian`]: second differences of a scalar objective, central
//!   first with a forward fallback, then symmetrized.
//!
//! Invariants & assumptions
//! ------------------------
//! - Hessian steps are relative, `h_i = ε^{1/4} · max(|θ_i|, 1)`, which
//!   balances truncation and rounding error for second differences of an
//!   objective evaluated to machine precision.
//! - Returned gradients/Hessians always pass [`validate_grad`] /
//!   [`validate_hessian`].
//!
//! Conventions
//! -----------
//! - Derivatives are taken in unconstrained θ-space; any reparameterization is
//!   handled by callers (e.g. the delta method in `inference`).
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use ndarray::Array2;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the gradient is approximated.
/// - `func`: `&G`
///   Scalar objective. Evaluation errors are expected to be parked in
///   `closure_err` with `NaN` returned in their place.
/// - `closure_err`: `&RefCell<Option<Error>>`
///   Error side channel; cleared on entry and inspected afterwards.
///
/// Returns
/// -------
/// `OptResult<Grad>`
///   The gradient if no error was captured and it validates.
///
/// Errors
/// ------
/// - The captured argmin error, converted into `OptError`.
/// - `GradientDimMismatch` / `InvalidGradient` from [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// compute_hessian — value-based finite-difference Hessian.
///
/// Purpose
/// -------
/// Approximate `∇²f(θ)` for a scalar objective using only function values.
/// Central second differences are tried first; if they produce non-finite
/// entries (e.g. a step leaves the feasible region on one side) a one-sided
/// forward scheme is used instead.
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Scalar objective `θ ↦ f(θ)`; may return non-finite values off its domain.
/// - `theta`: `&Theta`
///   Evaluation point; its length fixes the Hessian dimension.
///
/// Returns
/// -------
/// `OptResult<Hessian>`
///   A finite, symmetric `n × n` matrix.
///
/// Errors
/// ------
/// - `OptError::InvalidHessian` when both schemes produce non-finite entries.
///
/// Notes
/// -----
/// - Cost: `2n² + 1` evaluations for the central scheme.
pub fn compute_hessian<F: Fn(&Theta) -> f64>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut cent_hess = central_hessian(f, theta);
    match validate_hessian(&cent_hess, dim) {
        Ok(_) => {
            symmetrize_hess(&mut cent_hess);
            Ok(cent_hess)
        }
        Err(_) => {
            let mut forward_hess = forward_hessian(f, theta);
            validate_hessian(&forward_hess, dim)?;
            symmetrize_hess(&mut forward_hess);
            Ok(forward_hess)
        }
    }
}

// ---- Helper methods ----

fn hessian_steps(theta: &Theta) -> Vec<f64> {
    let base = f64::EPSILON.powf(0.25);
    theta.iter().map(|x| base * x.abs().max(1.0)).collect()
}

fn shifted(theta: &Theta, moves: &[(usize, f64)]) -> Theta {
    let mut out = theta.clone();
    for &(i, delta) in moves {
        out[i] += delta;
    }
    out
}

fn central_hessian<F: Fn(&Theta) -> f64>(f: &F, theta: &Theta) -> Hessian {
    let n = theta.len();
    let h = hessian_steps(theta);
    let f0 = f(theta);
    let mut hess = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let fp = f(&shifted(theta, &[(i, h[i])]));
        let fm = f(&shifted(theta, &[(i, -h[i])]));
        hess[[i, i]] = (fp - 2.0 * f0 + fm) / (h[i] * h[i]);
        for j in 0..i {
            let fpp = f(&shifted(theta, &[(i, h[i]), (j, h[j])]));
            let fpm = f(&shifted(theta, &[(i, h[i]), (j, -h[j])]));
            let fmp = f(&shifted(theta, &[(i, -h[i]), (j, h[j])]));
            let fmm = f(&shifted(theta, &[(i, -h[i]), (j, -h[j])]));
            let value = (fpp - fpm - fmp + fmm) / (4.0 * h[i] * h[j]);
            hess[[i, j]] = value;
            hess[[j, i]] = value;
        }
    }
    hess
}

fn forward_hessian<F: Fn(&Theta) -> f64>(f: &F, theta: &Theta) -> Hessian {
    let n = theta.len();
    let h = hessian_steps(theta);
    let f0 = f(theta);
    let single: Vec<f64> = (0..n).map(|i| f(&shifted(theta, &[(i, h[i])]))).collect();
    let mut hess = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let fpp = f(&shifted(theta, &[(i, 2.0 * h[i])]));
        hess[[i, i]] = (fpp - 2.0 * single[i] + f0) / (h[i] * h[i]);
        for j in 0..i {
            let fij = f(&shifted(theta, &[(i, h[i]), (j, h[j])]));
            let value = (fij - single[i] - single[j] + f0) / (h[i] * h[j]);
            hess[[i, j]] = value;
            hess[[j, i]] = value;
        }
    }
    hess
}

/// Average each off-diagonal pair in place; the diagonal is untouched.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use argmin::core::ArgminError;
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Forward-difference gradients with and without closure errors.
    // - Value-based Hessians on quadratics and on a function whose central
    //   stencil leaves the domain.
    // - Symmetrization.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `run_fd_diff` returns a valid gradient for a smooth objective.
    //
    // Given
    // -----
    // - f(θ) = θᵀθ at θ = (0, 1).
    //
    // Expect
    // ------
    // - A finite gradient close to (0, 2).
    fn run_fd_diff_quadratic_returns_valid_gradient() {
        // Arrange
        let theta: Theta = array![0.0, 1.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |x: &Theta| x.dot(x);

        // Act
        let grad = run_fd_diff(&theta, &f, &closure_err).expect("gradient should succeed");

        // Assert
        assert!(grad[0].abs() < 1e-6);
        assert!((grad[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // An error captured inside the closure is surfaced as an `OptError`.
    //
    // Given
    // -----
    // - A closure that stores `ArgminError::NotImplemented` and returns NaN.
    //
    // Expect
    // ------
    // - `Err(OptError::NotImplemented { .. })`.
    fn run_fd_diff_closure_error_is_propagated() {
        // Arrange
        let theta: Theta = array![1.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_: &Theta| {
            closure_err.replace(Some(ArgminError::NotImplemented { text: "fd".into() }.into()));
            f64::NAN
        };

        // Act
        let err = run_fd_diff(&theta, &f, &closure_err).expect_err("closure error must surface");

        // Assert
        assert!(matches!(err, OptError::NotImplemented { .. }));
    }

    #[test]
    // Purpose
    // -------
    // The central Hessian of a quadratic recovers its constant matrix.
    //
    // Given
    // -----
    // - f(θ) = 2θ₀² + θ₀θ₁ + 0.5θ₁² with Hessian [[4, 1], [1, 1]].
    //
    // Expect
    // ------
    // - Entry-wise agreement to 1e-6 and exact symmetry.
    fn compute_hessian_recovers_quadratic_form() {
        // Arrange
        let theta: Theta = array![0.3, -1.2];
        let f = |x: &Theta| 2.0 * x[0] * x[0] + x[0] * x[1] + 0.5 * x[1] * x[1];

        // Act
        let hess = compute_hessian(&f, &theta).expect("finite Hessian");

        // Assert
        let expected = array![[4.0, 1.0], [1.0, 1.0]];
        for ((i, j), v) in hess.indexed_iter() {
            assert!((v - expected[[i, j]]).abs() < 1e-6, "entry ({i}, {j}) = {v}");
        }
        assert_eq!(hess[[0, 1]], hess[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // When the central stencil steps outside the domain, the forward scheme
    // takes over.
    //
    // Given
    // -----
    // - f(θ) = θ² for θ ≥ 0 and NaN below, evaluated at θ = 0.
    //
    // Expect
    // ------
    // - A finite Hessian close to 2.
    fn compute_hessian_falls_back_to_forward_scheme() {
        // Arrange
        let theta: Theta = Array1::zeros(1);
        let f = |x: &Theta| if x[0] < 0.0 { f64::NAN } else { x[0] * x[0] };

        // Act
        let hess = compute_hessian(&f, &theta).expect("forward scheme should succeed");

        // Assert
        assert!((hess[[0, 0]] - 2.0).abs() < 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // A nowhere-finite objective produces `InvalidHessian`.
    //
    // Given
    // -----
    // - f ≡ NaN.
    //
    // Expect
    // ------
    // - `Err(OptError::InvalidHessian { .. })`.
    fn compute_hessian_non_finite_entries_yield_invalidhessian_error() {
        let theta: Theta = array![0.0];
        let err = compute_hessian(&|_: &Theta| f64::NAN, &theta).expect_err("must fail");
        assert!(matches!(err, OptError::InvalidHessian { .. }));
    }

    #[test]
    // Purpose
    // -------
    // `symmetrize_hess` averages off-diagonal pairs and keeps the diagonal.
    //
    // Given
    // -----
    // - [[1, 2], [0, 3]].
    //
    // Expect
    // ------
    // - [[1, 1], [1, 3]].
    fn symmetrize_hess_makes_matrix_symmetric() {
        let mut h: Hessian = array![[1.0, 2.0], [0.0, 3.0]];
        symmetrize_hess(&mut h);
        assert_eq!(h, array![[1.0, 1.0], [1.0, 3.0]]);
    }
}
