//! Validation helpers — reusable column checks for customer summary data.
//!
//! Purpose
//! -------
//! Centralize the small checks every data container runs at construction:
//! column lengths, finiteness and sign of observations, recency/age
//! ordering, and weights. Also hosts the median-based time scale used by
//! the fitter.
//!
//! Key behaviors
//! -------------
//! - Each check scans its column once and reports the **first** offending
//!   row as a structured [`BtydError`].
//! - [`time_scale`] picks the divisor applied to recency and age before
//!   fitting.
//!
//! Invariants & assumptions
//! ------------------------
//! - Columns are `ndarray::Array1<f64>`; integer counts are carried as
//!   floats and checked for integrality only where a model requires it.
//!
//! Conventions
//! -----------
//! - Indices in errors are 0-based subject rows.
//! - No I/O and no logging.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each helper on valid input and on the first-offender
//!   reporting, plus the median fallbacks of [`time_scale`].
use crate::btyd::errors::{BtydError, BtydResult};
use ndarray::Array1;

/// Require `found == expected` for a named column.
pub fn validate_length(column: &'static str, expected: usize, found: usize) -> BtydResult<()> {
    if found != expected {
        return Err(BtydError::LengthMismatch { column, expected, found });
    }
    Ok(())
}

/// Require every entry of `values` to be finite and non-negative.
///
/// Errors
/// ------
/// - `BtydError::InvalidObservation` for the first NaN/±∞ or negative entry.
pub fn validate_non_negative(column: &'static str, values: &Array1<f64>) -> BtydResult<()> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(BtydError::InvalidObservation {
                column,
                index,
                value,
                reason: "must be finite",
            });
        }
        if value < 0.0 {
            return Err(BtydError::InvalidObservation {
                column,
                index,
                value,
                reason: "must be non-negative",
            });
        }
    }
    Ok(())
}

/// Require every entry of `values` to be a whole number.
///
/// Assumes [`validate_non_negative`] already passed.
pub fn validate_integral(column: &'static str, values: &Array1<f64>) -> BtydResult<()> {
    match values.iter().position(|v| v.fract() != 0.0) {
        Some(index) => Err(BtydError::InvalidObservation {
            column,
            index,
            value: values[index],
            reason: "must be a whole number",
        }),
        None => Ok(()),
    }
}

/// Require `recency[i] ≤ age[i]` for every row.
pub fn validate_recency_age(recency: &Array1<f64>, age: &Array1<f64>) -> BtydResult<()> {
    for (index, (&rec, &a)) in recency.iter().zip(age.iter()).enumerate() {
        if rec > a {
            return Err(BtydError::RecencyExceedsAge { index, recency: rec, age: a });
        }
    }
    Ok(())
}

/// Require every weight to be finite and strictly positive.
pub fn validate_weights(weights: &Array1<f64>) -> BtydResult<()> {
    match weights.iter().position(|w| !w.is_finite() || *w <= 0.0) {
        Some(index) => Err(BtydError::InvalidWeight { index, value: weights[index] }),
        None => Ok(()),
    }
}

/// Require every monetary value to be finite and non-negative.
pub fn validate_monetary(values: &Array1<f64>) -> BtydResult<()> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(BtydError::InvalidMonetaryValue { index, value, reason: "must be finite" });
        }
        if value < 0.0 {
            return Err(BtydError::InvalidMonetaryValue {
                index,
                value,
                reason: "must be non-negative",
            });
        }
    }
    Ok(())
}

/// Median of a finite column; `NaN` for an empty one.
///
/// Even lengths average the two middle order statistics.
pub fn median(values: &Array1<f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    if n % 2 == 1 { sorted[n / 2] } else { 0.5 * (sorted[n / 2 - 1] + sorted[n / 2]) }
}

/// time_scale — divisor applied to the time columns before fitting.
///
/// Parameters
/// ----------
/// - `age`: `&Array1<f64>`
///   Validated, non-negative ages.
///
/// Returns
/// -------
/// `f64`
///   `median(age)` when positive, else `max(age)` when positive, else `1`.
pub fn time_scale(age: &Array1<f64>) -> f64 {
    let med = median(age);
    if med > 0.0 {
        return med;
    }
    let max = age.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 { max } else { 1.0 }
}
