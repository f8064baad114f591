//! special_functions::log_sum_exp — overflow-free sums of exponentials.
//!
//! Purpose
//! -------
//! Evaluate `ln Σ_k exp(x_k)` and its signed variant without overflow, so that
//! likelihoods built from several exponential-family pieces can be combined in
//! log space.
//!
//! Conventions
//! -----------
//! - Any `NaN` input yields `NaN`; callers rely on this to let the optimizer
//!   steer away from invalid regions instead of failing.
//! - An all-`-∞` input (an empty sum) yields `-∞`.

/// log_sum_exp — compute `ln Σ exp(x_k)` with max-shifting.
///
/// Parameters
/// ----------
/// - `terms`: `&[f64]`
///   Log-domain terms. May contain `-∞` (zero contributions).
///
/// Returns
/// -------
/// `f64`
///   `ln Σ exp(terms)`, `-∞` for an empty slice or all `-∞` input, `+∞` if any
///   term is `+∞`, `NaN` if any term is `NaN`.
pub fn log_sum_exp(terms: &[f64]) -> f64 {
    let mut max = f64::NEG_INFINITY;
    for &x in terms {
        if x.is_nan() {
            return f64::NAN;
        }
        if x > max {
            max = x;
        }
    }
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = terms.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// log_add_exp — two-term `ln(exp(a) + exp(b))`.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    let max = a.max(b);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    max + (-(a - b).abs()).exp().ln_1p()
}

/// signed_log_sum_exp — `ln |Σ s_k exp(x_k)|` together with the sign of the sum.
///
/// Purpose
/// -------
/// Combine log-domain magnitudes with explicit signs `s_k ∈ {-1, 0, +1}` (any
/// real scale factor is accepted) while keeping the arithmetic max-shifted.
///
/// Parameters
/// ----------
/// - `terms`: `&[f64]`
///   Log-domain magnitudes `x_k`.
/// - `signs`: `&[f64]`
///   Multipliers `s_k`, same length as `terms`.
///
/// Returns
/// -------
/// `(f64, f64)`
///   `(ln |S|, sign(S))` with `S = Σ s_k exp(x_k)`. When `S == 0` the result is
///   `(-∞, 0.0)`. `NaN` inputs propagate as `(NaN, NaN)`.
///
/// Panics
/// ------
/// - Panics if `terms.len() != signs.len()` (programmer error).
pub fn signed_log_sum_exp(terms: &[f64], signs: &[f64]) -> (f64, f64) {
    assert_eq!(terms.len(), signs.len(), "terms and signs must have equal length");
    let mut max = f64::NEG_INFINITY;
    for (&x, &s) in terms.iter().zip(signs) {
        if x.is_nan() || s.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        if s != 0.0 && x > max {
            max = x;
        }
    }
    if max == f64::NEG_INFINITY {
        return (f64::NEG_INFINITY, 0.0);
    }
    if max == f64::INFINITY {
        return (f64::NAN, f64::NAN);
    }
    let sum: f64 = terms.iter().zip(signs).map(|(&x, &s)| s * (x - max).exp()).sum();
    if sum == 0.0 {
        return (f64::NEG_INFINITY, 0.0);
    }
    (max + sum.abs().ln(), sum.signum())
}
