//! Unified error handling for inference routines.
//!
//! `InferenceError` covers the failures of post-estimation diagnostics:
//! singular or indefinite curvature at the optimum, invalid confidence
//! levels, shape mismatches, and optimizer-layer errors raised while the
//! Hessian is approximated. `InferenceResult<T>` standardizes the return
//! type across inference code.
use crate::optimization::errors::OptError;
use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    // ---- Curvature ----
    /// The Hessian is singular or not positive definite at the optimum.
    #[error(
        "Singular or non positive definite Hessian: eigenvalues in [{min_eigenvalue}, {max_eigenvalue}]"
    )]
    SingularHessian { min_eigenvalue: f64, max_eigenvalue: f64 },

    #[error("Non-finite variance at index {index}: {value}")]
    NonFiniteVariance { index: usize, value: f64 },

    // ---- Options ----
    #[error("Invalid confidence level {level}: {reason}")]
    InvalidConfidenceLevel { level: f64, reason: &'static str },

    // ---- Shapes ----
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimMismatch { expected: usize, found: usize },

    // ---- Optimizer passthrough ----
    #[error(transparent)]
    Opt(#[from] OptError),
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Conversion from `OptError`.
    // - Display of a representative variant.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Optimizer errors pass through unchanged and keep their message.
    //
    // Given
    // -----
    // - `OptError::EmptyTheta`.
    //
    // Expect
    // ------
    // - `InferenceError::Opt(EmptyTheta)` with the same Display string.
    fn opt_errors_convert_transparently() {
        let err: InferenceError = OptError::EmptyTheta.into();
        assert_eq!(err.to_string(), OptError::EmptyTheta.to_string());
        assert_eq!(err, InferenceError::Opt(OptError::EmptyTheta));
    }

    #[test]
    // Purpose
    // -------
    // The confidence-level message names the offending value.
    //
    // Given
    // -----
    // - level = 1.5.
    //
    // Expect
    // ------
    // - The Display string contains "1.5".
    fn confidence_level_message_contains_value() {
        let err = InferenceError::InvalidConfidenceLevel { level: 1.5, reason: "must be in (0, 1)" };
        assert!(err.to_string().contains("1.5"));
    }
}
