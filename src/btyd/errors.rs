//! Errors for buy-till-you-die models (input validation, parameter
//! handling, fit state, persistence, and optimizer/inference failures).
//!
//! This module defines the model-layer error type, [`BtydError`], and the
//! [`BtydResult`] alias used across data containers, models, the fitter,
//! CLV helpers, and persistence.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to subject rows.
//! - Column names in messages match the container field names
//!   (`frequency`, `recency`, `age`, `weights`, `monetary_value`).
//! - Optimizer and inference failures pass through unchanged via
//!   [`BtydError::Optimization`] and [`BtydError::Inference`].
use crate::{
    btyd::models::traits::ModelKind, inference::errors::InferenceError,
    optimization::errors::OptError,
};
use thiserror::Error;

/// Crate-wide result alias for model operations that may produce [`BtydError`].
pub type BtydResult<T> = Result<T, BtydError>;

/// Unified error type for buy-till-you-die modeling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BtydError {
    // ---- Input/data validation ----
    #[error("Column '{column}' has {found} entries, expected {expected}")]
    LengthMismatch { column: &'static str, expected: usize, found: usize },

    #[error("Invalid {column} at index {index}: {value} ({reason})")]
    InvalidObservation { column: &'static str, index: usize, value: f64, reason: &'static str },

    #[error("Recency {recency} exceeds age {age} at index {index}")]
    RecencyExceedsAge { index: usize, recency: f64, age: f64 },

    #[error("Invalid weight at index {index}: {value} (weights must be finite and positive)")]
    InvalidWeight { index: usize, value: f64 },

    #[error("Invalid monetary value at index {index}: {value} ({reason})")]
    InvalidMonetaryValue { index: usize, value: f64, reason: &'static str },

    #[error("Covariate matrix '{matrix}' has {found} rows, expected {expected}")]
    CovariateShape { matrix: &'static str, expected: usize, found: usize },

    #[error("Covariate matrix '{matrix}' has {found} columns, coefficients expect {expected}")]
    CovariateWidth { matrix: &'static str, expected: usize, found: usize },

    #[error("At least one subject is required")]
    EmptyData,

    // ---- Options ----
    #[error("Invalid option '{option}' = {value}: {reason}")]
    InvalidOption { option: &'static str, value: f64, reason: &'static str },

    #[error("Invalid time unit '{name}': expected one of W, M, D, H")]
    InvalidTimeUnit { name: String },

    // ---- Parameters ----
    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParams { name: String, value: f64, reason: &'static str },

    #[error("Parameter count mismatch: expected {expected}, found {found}")]
    ParamCountMismatch { expected: usize, found: usize },

    #[error("Missing parameter '{name}'")]
    MissingParam { name: String },

    // ---- Fit state ----
    #[error("Model has no fitted parameters")]
    NotFitted,

    #[error("Training data were not kept; pass explicit bounds")]
    MissingTrainingData,

    #[error("Model kind mismatch: expected {expected}, found {found}")]
    ModelKindMismatch { expected: ModelKind, found: ModelKind },

    #[error("Unknown model kind '{name}'")]
    UnknownModelKind { name: String },

    // ---- Persistence ----
    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    // ---- Passthrough ----
    #[error(transparent)]
    Optimization(#[from] OptError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl From<std::io::Error> for BtydError {
    fn from(err: std::io::Error) -> Self {
        BtydError::Persistence { reason: err.to_string() }
    }
}

impl From<serde_json::Error> for BtydError {
    fn from(err: serde_json::Error) -> Self {
        BtydError::Persistence { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Display strings carry the offending values.
    // - Conversions from optimizer, I/O and JSON errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Validation messages name the column, the index and the value.
    //
    // Given
    // -----
    // - An `InvalidObservation` for a negative frequency at index 3.
    //
    // Expect
    // ------
    // - The message contains "frequency", "3" and "-1".
    fn invalid_observation_message_names_column_and_value() {
        let err = BtydError::InvalidObservation {
            column: "frequency",
            index: 3,
            value: -1.0,
            reason: "must be non-negative",
        };
        let msg = err.to_string();
        assert!(msg.contains("frequency"));
        assert!(msg.contains('3'));
        assert!(msg.contains("-1"));
    }

    #[test]
    // Purpose
    // -------
    // Lower-layer errors convert into the matching variants.
    //
    // Given
    // -----
    // - `OptError::EmptyTheta`, an I/O error and a JSON parse error.
    //
    // Expect
    // ------
    // - `Optimization(EmptyTheta)` and two `Persistence` errors.
    fn lower_layer_errors_convert() {
        let opt: BtydError = OptError::EmptyTheta.into();
        assert_eq!(opt, BtydError::Optimization(OptError::EmptyTheta));

        let io: BtydError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, BtydError::Persistence { .. }));

        let json_err = serde_json::from_str::<f64>("not json").unwrap_err();
        let json: BtydError = json_err.into();
        assert!(matches!(json, BtydError::Persistence { .. }));
    }
}
