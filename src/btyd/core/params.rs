//! Named parameter vectors and per-parameter fitting metadata.
//!
//! Purpose
//! -------
//! Carry fitted parameters as an ordered, named mapping (the form users,
//! logs and persisted state see) and describe how each parameter is fitted:
//! its optimizer link and whether it is measured in time units.
//!
//! Key behaviors
//! -------------
//! - [`ParamVector`]: ordered `(name, value)` pairs with lookup, ordered
//!   extraction ([`ParamVector::unload`]) and a compact `Display`.
//! - [`ParamSpec`]: name, [`ParamTransform`] and a `time_scaled` flag for
//!   one parameter.
//! - [`ModelParams`]: conversion between a model's typed parameter struct
//!   and its [`ParamVector`].
//! - [`positive_param`]: shared guard for strictly positive parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - Names within a vector are unique; order is the model's declared order.
//! - A `time_scaled` parameter is a rate in inverse time units: after a fit
//!   on data divided by `scale`, its value is multiplied by `scale`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction guards, `unload` ordering and failures,
//!   and the `Display` form.
use crate::{
    btyd::errors::{BtydError, BtydResult},
    optimization::numerical_stability::transformations::ParamTransform,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How one parameter is fitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub transform: ParamTransform,
    pub time_scaled: bool,
}

impl ParamSpec {
    /// Strictly positive parameter linked through `exp`.
    pub fn positive(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: ParamTransform::Positive, time_scaled: false }
    }

    /// Positive parameter measured in inverse time units.
    pub fn time_scaled(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: ParamTransform::Positive, time_scaled: true }
    }

    /// Real-valued coefficient linked through the identity.
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: ParamTransform::Unconstrained, time_scaled: false }
    }

    /// Parameter constrained to `(1, ∞)`.
    pub fn shifted_positive(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: ParamTransform::ShiftedPositive, time_scaled: false }
    }

    /// Generic starting value: the image of `θ = 0` under the transform.
    pub fn default_value(&self) -> f64 {
        self.transform.to_model(0.0)
    }
}

/// Ordered, named parameter values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamVector {
    entries: Vec<(String, f64)>,
}

impl ParamVector {
    /// Pair names with values.
    ///
    /// # Errors
    /// - `BtydError::ParamCountMismatch` when the lengths differ.
    pub fn new(names: Vec<String>, values: &[f64]) -> BtydResult<Self> {
        if names.len() != values.len() {
            return Err(BtydError::ParamCountMismatch {
                expected: names.len(),
                found: values.len(),
            });
        }
        Ok(Self { entries: names.into_iter().zip(values.iter().copied()).collect() })
    }

    /// Build from `(name, value)` pairs in order.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self { entries: pairs.into_iter().map(|(n, v)| (n.into(), v)).collect() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of `name`.
    ///
    /// # Errors
    /// - `BtydError::MissingParam` if absent.
    pub fn get(&self, name: &str) -> BtydResult<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| BtydError::MissingParam { name: name.to_string() })
    }

    /// Values of `names`, in the requested order.
    ///
    /// # Errors
    /// - `BtydError::NotFitted` on an empty vector.
    /// - `BtydError::MissingParam` for the first unknown name.
    pub fn unload(&self, names: &[&str]) -> BtydResult<Vec<f64>> {
        if self.is_empty() {
            return Err(BtydError::NotFitted);
        }
        names.iter().map(|name| self.get(name)).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> Array1<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Values of all entries whose name starts with `prefix`, in order.
    pub fn values_with_prefix(&self, prefix: &str) -> Vec<f64> {
        self.entries.iter().filter(|(n, _)| n.starts_with(prefix)).map(|(_, v)| *v).collect()
    }
}

impl fmt::Display for ParamVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.entries {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}: {value:?}")?;
        }
        Ok(())
    }
}

/// Conversion between a model's typed parameters and a [`ParamVector`].
pub trait ModelParams: Sized + Clone + fmt::Debug + PartialEq {
    fn to_vector(&self) -> ParamVector;

    /// Rebuild and validate typed parameters from named values.
    ///
    /// # Errors
    /// - `BtydError::NotFitted` for an empty vector.
    /// - `BtydError::MissingParam` / `BtydError::InvalidParams` for absent
    ///   or out-of-range entries.
    fn from_vector(vector: &ParamVector) -> BtydResult<Self>;
}

/// Require a finite, strictly positive parameter value.
pub fn positive_param(name: &str, value: f64) -> BtydResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BtydError::InvalidParams {
            name: name.to_string(),
            value,
            reason: "must be finite and strictly positive",
        });
    }
    Ok(value)
}

/// Require a finite parameter value.
pub fn finite_param(name: &str, value: f64) -> BtydResult<f64> {
    if !value.is_finite() {
        return Err(BtydError::InvalidParams {
            name: name.to_string(),
            value,
            reason: "must be finite",
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - `unload` ordering, empty-vector and missing-name failures.
    // - `Display` formatting and constructor guards.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `unload` returns values in the requested order, not storage order.
    //
    // Given
    // -----
    // - x = 12.3, y = 42.
    //
    // Expect
    // ------
    // - `unload(["y", "x"]) == [42, 12.3]`; a missing name errors.
    fn unload_follows_requested_order() {
        let params = ParamVector::from_pairs([("x", 12.3), ("y", 42.0)]);
        assert_eq!(params.unload(&["y", "x"]), Ok(vec![42.0, 12.3]));
        assert_eq!(
            params.unload(&["z"]),
            Err(BtydError::MissingParam { name: "z".to_string() })
        );
    }

    #[test]
    // Purpose
    // -------
    // An empty vector means the model was never fitted.
    //
    // Given
    // -----
    // - `ParamVector::default()`.
    //
    // Expect
    // ------
    // - `unload` fails with `NotFitted`.
    fn empty_vector_is_not_fitted() {
        assert_eq!(ParamVector::default().unload(&["x"]), Err(BtydError::NotFitted));
    }

    #[test]
    // Purpose
    // -------
    // Display lists `name: value` pairs in order.
    //
    // Given
    // -----
    // - x = 12.3, y = 42.
    //
    // Expect
    // ------
    // - "x: 12.3, y: 42.0".
    fn display_lists_pairs() {
        let params = ParamVector::from_pairs([("x", 12.3), ("y", 42.0)]);
        assert_eq!(params.to_string(), "x: 12.3, y: 42.0");
    }

    #[test]
    // Purpose
    // -------
    // Construction and value guards reject bad input.
    //
    // Given
    // -----
    // - Two names with one value; a zero "alpha"; an infinite coefficient.
    //
    // Expect
    // ------
    // - `ParamCountMismatch`, then `InvalidParams` twice.
    fn guards_reject_bad_values() {
        let err = ParamVector::new(vec!["a".into(), "b".into()], &[1.0]);
        assert_eq!(err, Err(BtydError::ParamCountMismatch { expected: 2, found: 1 }));
        assert!(matches!(positive_param("alpha", 0.0), Err(BtydError::InvalidParams { .. })));
        assert!(matches!(finite_param("gamma", f64::INFINITY), Err(BtydError::InvalidParams { .. })));
        assert_eq!(positive_param("alpha", 2.0), Ok(2.0));
    }
}
