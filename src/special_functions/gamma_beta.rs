//! special_functions::gamma_beta — NaN-propagating gamma/beta wrappers.
//!
//! Thin wrappers over `statrs` that never panic: arguments outside the
//! functions' domains (non-positive shapes, `x ∉ [0, 1]`) return `NaN` so the
//! likelihood code can hand invalid regions back to the optimizer as
//! non-finite costs.

use statrs::function::{
    beta::{checked_beta_reg, checked_ln_beta},
    gamma::ln_gamma as statrs_ln_gamma,
};

/// `ln Γ(x)` for `x > 0`; `NaN` otherwise.
pub fn ln_gamma(x: f64) -> f64 {
    if x.is_nan() || x <= 0.0 {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    statrs_ln_gamma(x)
}

/// `ln B(a, b)` for `a, b > 0`; `NaN` otherwise.
pub fn ln_beta(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if !a.is_finite() || !b.is_finite() {
        return f64::NEG_INFINITY;
    }
    checked_ln_beta(a, b).unwrap_or(f64::NAN)
}

/// `ln n!` through `ln Γ(n + 1)`.
pub fn ln_factorial(n: f64) -> f64 {
    if n.is_nan() || n < 0.0 {
        return f64::NAN;
    }
    ln_gamma(n + 1.0)
}

/// Regularized incomplete beta `I_x(a, b)`.
///
/// Parameters
/// ----------
/// - `a`, `b`: `f64`, strictly positive shapes.
/// - `x`: `f64` in `[0, 1]`.
///
/// Returns
/// -------
/// `f64`
///   `I_x(a, b) ∈ [0, 1]`, or `NaN` outside the domain.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if a.is_nan() || b.is_nan() || x.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    checked_beta_reg(a, b, x).map(|v| v.clamp(0.0, 1.0)).unwrap_or(f64::NAN)
}
