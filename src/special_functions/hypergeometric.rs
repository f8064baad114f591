//! special_functions::hypergeometric — guarded Gauss hypergeometric series.
//!
//! Purpose
//! -------
//! Evaluate `ln ₂F₁(a, b; c; z)` for `0 ≤ z < 1` and positive parameters, as
//! required by the BG/NBD, Modified BG/NBD and Pareto/NBD predictive formulas
//! and by the Pareto/NBD likelihood.
//!
//! Key behaviors
//! -------------
//! - Sums the power series with the term-ratio recurrence
//!   `t_{n+1} = t_n · (a+n)(b+n) / ((c+n)(n+1)) · z` in a rescaled log domain,
//!   so terms that grow to `exp(700)` and beyond never overflow.
//! - Applies Euler's transformation
//!   `₂F₁(a,b;c;z) = (1-z)^{c-a-b} ₂F₁(c-a, c-b; c; z)` when it shrinks the
//!   leading ratio and keeps every term positive (large-frequency inputs).
//! - Bounded loop: at most [`HYP2F1_MAX_TERMS`] terms; on exhaustion the
//!   partial sum is returned and a `debug!` record is emitted.
//! - [`scaled_gamma_tail`] evaluates the bracket
//!   `k/(a-1) · [1 - (α/(α+t))^r ₂F₁(r, b; c; t/(α+t))]` shared by the
//!   BG/NBD-family expectations. When `c ≤ 0` or `a` is close to 1 it
//!   switches to a Pfaff-transformed series in which `1/(a-1)` and `1/c`
//!   cancel analytically.
//!
//! Invariants & assumptions
//! ------------------------
//! - `NaN` in any argument propagates as `NaN`.
//! - A non-positive partial sum has no logarithm and yields `NaN`; callers
//!   treat this like any other invalid likelihood value.
//! - `z` outside `[0, 1)` is outside the supported domain and yields `NaN`.

use log::debug;

/// Hard cap on the number of series terms.
pub const HYP2F1_MAX_TERMS: usize = 20_000;

/// Distance from `a = 1` below which [`scaled_gamma_tail`] leaves the closed
/// form.
const NEAR_UNIT_SHAPE: f64 = 1e-4;

/// Rescale the running sum when a term exceeds the current scale by this much
/// (in log units).
const RESCALE_LOG_GAP: f64 = 600.0;

/// log_hyp2f1 — `ln ₂F₁(a, b; c; z)` by a guarded power series.
///
/// Parameters
/// ----------
/// - `a`, `b`: `f64`
///   Numerator parameters.
/// - `c`: `f64`
///   Denominator parameter, `c > 0`.
/// - `z`: `f64`
///   Argument in `[0, 1)`.
///
/// Returns
/// -------
/// `f64`
///   `ln ₂F₁(a, b; c; z)`, or `NaN` on invalid input or a non-positive sum.
///
/// Notes
/// -----
/// - `z == 0` returns exactly `0.0`.
/// - Stopping rule: stop once the series is past its largest term
///   (ratio below one) and the latest contribution is at most
///   `f64::EPSILON` times the running sum, or once the ratio vanishes
///   (a terminating series).
pub fn log_hyp2f1(a: f64, b: f64, c: f64, z: f64) -> f64 {
    if a.is_nan() || b.is_nan() || c.is_nan() || z.is_nan() {
        return f64::NAN;
    }
    if !(0.0..1.0).contains(&z) || c <= 0.0 {
        return f64::NAN;
    }
    if z == 0.0 || a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let (ca, cb) = (c - a, c - b);
    if ca > 0.0 && cb > 0.0 && (ca * cb).abs() < (a * b).abs() {
        let prefactor = (c - a - b) * (-z).ln_1p();
        return prefactor + log_series(ca, cb, c, z);
    }
    log_series(a, b, c, z)
}

/// hyp2f1 — `₂F₁(a, b; c; z)` on the natural scale.
///
/// Overflows to `+∞` when the logarithm exceeds the `f64` range.
pub fn hyp2f1(a: f64, b: f64, c: f64, z: f64) -> f64 {
    log_hyp2f1(a, b, c, z).exp()
}

/// scaled_gamma_tail — `k/(a-1) · [1 - q^r ₂F₁(r, b; c; 1-q)]`, `q = α/(α+t)`.
///
/// Parameters
/// ----------
/// - `k`: `f64`
///   Prefactor of the bracket.
/// - `r`, `alpha`: `f64`
///   Gamma shape and rate, both positive.
/// - `a`, `b`, `c`: `f64`
///   Positive `a`, with `b = c - a + 1` and `c + 1 > 0`.
/// - `t`: `f64`
///   Horizon, `t > 0`.
///
/// Returns
/// -------
/// `f64`
///   The bracket, finite for every admissible input including `c ≤ 0` and
///   `a = 1`, where the closed form is `0/0` or undefined.
///
/// Notes
/// -----
/// - Two Pfaff transformations give
///   `q^r ₂F₁(r, b; c; 1-q) = q^{a-1} ₂F₁(c-r, a-1; c; 1-q)`. Writing the
///   right-hand series as `1 + (a-1)/c · Σ_{n≥1} v_n` with
///   `v_n = (c-r)_n (a)_{n-1} / ((c+1)_{n-1} n!) · (1-q)^n` leaves
///   `-[k (q^{a-1} - 1)/(a-1) + (k/c) q^{a-1} Σ v_n]`, which has no pole.
/// - The closed form is used whenever it is well conditioned.
pub fn scaled_gamma_tail(k: f64, r: f64, alpha: f64, a: f64, b: f64, c: f64, t: f64) -> f64 {
    let z = t / (alpha + t);
    if c > 0.0 && (a - 1.0).abs() >= NEAR_UNIT_SHAPE {
        let log_tail = log_hyp2f1(r, b, c, z) + r * (alpha / (alpha + t)).ln();
        let closed = k / (a - 1.0) * -log_tail.exp_m1();
        if closed.is_finite() {
            return closed;
        }
    }
    pfaff_tail(k, r, alpha, a, c, t)
}

// ---- Helper methods ----

fn pfaff_tail(k: f64, r: f64, alpha: f64, a: f64, c: f64, t: f64) -> f64 {
    let ln_q = (alpha / (alpha + t)).ln();
    let z = t / (alpha + t);
    let shape_gap = a - 1.0;
    let exponent = shape_gap * ln_q;
    // (q^{a-1} - 1)/(a-1), with its limit ln q at a = 1.
    let unit_term = if exponent == 0.0 { ln_q } else { exponent.exp_m1() / shape_gap };
    let k_over_c = if k == c { 1.0 } else { k / c };

    let mut term = (c - r) * z;
    let mut acc = term;
    for n in 1..HYP2F1_MAX_TERMS {
        let nf = n as f64;
        let ratio = (c - r + nf) * (a + nf - 1.0) / ((c + nf) * (nf + 1.0)) * z;
        term *= ratio;
        acc += term;
        if ratio.abs() < 1.0 && term.abs() <= f64::EPSILON * acc.abs() {
            break;
        }
    }
    -(k * unit_term + k_over_c * exponent.exp() * acc)
}


fn log_series(a: f64, b: f64, c: f64, z: f64) -> f64 {
    // Sum = exp(log_scale) * acc, term_n = sign * exp(log_term).
    let mut log_scale = 0.0_f64;
    let mut acc = 1.0_f64;
    let mut log_term = 0.0_f64;
    let mut sign = 1.0_f64;
    let ln_z = z.ln();

    for n in 0..HYP2F1_MAX_TERMS {
        let nf = n as f64;
        let ratio = (a + nf) * (b + nf) / ((c + nf) * (nf + 1.0));
        if ratio == 0.0 {
            return finish(log_scale, acc);
        }
        if !ratio.is_finite() {
            return f64::NAN;
        }
        sign *= ratio.signum();
        log_term += ratio.abs().ln() + ln_z;
        if log_term - log_scale > RESCALE_LOG_GAP {
            acc *= (log_scale - log_term).exp();
            log_scale = log_term;
        }
        let contrib = sign * (log_term - log_scale).exp();
        acc += contrib;
        let past_peak = ratio.abs() * z < 1.0;
        if past_peak && contrib.abs() <= f64::EPSILON * acc.abs() {
            return finish(log_scale, acc);
        }
    }
    debug!(
        "hyp2f1({a}, {b}; {c}; {z}) hit the {HYP2F1_MAX_TERMS}-term cap; returning partial sum"
    );
    finish(log_scale, acc)
}

fn finish(log_scale: f64, acc: f64) -> f64 {
    if acc > 0.0 { log_scale + acc.ln() } else { f64::NAN }
}
