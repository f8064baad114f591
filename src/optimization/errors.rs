//! optimization::errors — unified error surface for the MLE layer.
//!
//! `OptError` covers option validation, objective/gradient/Hessian checks and
//! wrapped argmin backend failures. Argmin errors are downcast into the
//! matching variant through `From<argmin::core::Error>`.
use argmin::core::{ArgminError, Error};
use thiserror::Error;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    #[error("Gradient optimization not implemented")]
    GradientNotImplemented,

    #[error("Gradient dimension mismatch: expected {expected}, found {found}")]
    GradientDimMismatch { expected: usize, found: usize },

    #[error("Invalid gradient at index {index}: {value}: {reason}")]
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- MLEOptions ----
    #[error("Invalid gradient tolerance {tol}: {reason}")]
    InvalidTolGrad { tol: f64, reason: &'static str },

    #[error("Invalid cost function change tolerance {tol}: {reason}")]
    InvalidTolCost { tol: f64, reason: &'static str },

    #[error("Invalid maximum iterations {max_iter}: {reason}")]
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    #[error("No tolerances provided")]
    NoTolerancesProvided,

    #[error("Invalid line searcher '{name}': {reason}")]
    InvalidLineSearch { name: String, reason: &'static str },

    #[error("Invalid L-BFGS memory {mem}: {reason}")]
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    /// Initial simplex edge length for Nelder–Mead.
    #[error("Invalid simplex step {step}: {reason}")]
    InvalidSimplexStep { step: f64, reason: &'static str },

    // ---- Objective ----
    #[error("Non-finite cost value: {value}")]
    NonFiniteCost { value: f64 },

    #[error("Invalid initial parameter at index {index}: {value}: {reason}")]
    InvalidThetaInput { index: usize, value: f64, reason: &'static str },

    #[error("Empty parameter vector: at least one free parameter is required")]
    EmptyTheta,

    // ---- Optimizer outcome ----
    #[error("Invalid estimated parameter at index {index}: {value}: {reason}")]
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    #[error("Missing estimated parameters (theta hat)")]
    MissingThetaHat,

    // ---- Argmin ----
    #[error("Invalid parameter: {text}")]
    InvalidParameter { text: String },

    #[error("Not implemented: {text}")]
    NotImplemented { text: String },

    #[error("Not initialized: {text}")]
    NotInitialized { text: String },

    #[error("Condition violated: {text}")]
    ConditionViolated { text: String },

    #[error("Checkpoint not found: {text}")]
    CheckPointNotFound { text: String },

    #[error("Potential bug: {text}")]
    PotentialBug { text: String },

    #[error("Impossible error: {text}")]
    ImpossibleError { text: String },

    #[error("Backend error: {text}")]
    BackendError { text: String },

    // ---- Finite Diffs ----
    #[error("Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}")]
    HessianDimMismatch { expected: usize, found: (usize, usize) },

    #[error("Invalid Hessian at ({row}, {col}): {value}, must be finite")]
    InvalidHessian { row: usize, col: usize, value: f64 },

    // ---- Fallback ----
    #[error("Unknown error")]
    UnknownError,
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own objective travel through argmin boxed.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Conversions from boxed argmin errors into `OptError`.
    // - Display strings of representative variants.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Argmin-native errors map to their mirrored variants, and an `OptError`
    // that was boxed into argmin's error type comes back unchanged.
    //
    // Given
    // -----
    // - `ArgminError::NotImplemented` and `OptError::NonFiniteCost` boxed as
    //   `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `OptError::NotImplemented` and the original `NonFiniteCost`.
    fn argmin_errors_are_downcast() {
        // Arrange
        let argmin_err: Error = ArgminError::NotImplemented { text: "x".to_string() }.into();
        let own_err: Error = OptError::NonFiniteCost { value: f64::INFINITY }.into();

        // Act
        let mapped = OptError::from(argmin_err);
        let roundtrip = OptError::from(own_err);

        // Assert
        assert_eq!(mapped, OptError::NotImplemented { text: "x".to_string() });
        assert_eq!(roundtrip, OptError::NonFiniteCost { value: f64::INFINITY });
    }

    #[test]
    // Purpose
    // -------
    // Display output carries the offending values.
    //
    // Given
    // -----
    // - An `InvalidTolGrad` error.
    //
    // Expect
    // ------
    // - The message names the tolerance and the reason.
    fn display_includes_context() {
        let err = OptError::InvalidTolGrad { tol: -1.0, reason: "Tolerance must be positive." };
        assert_eq!(err.to_string(), "Invalid gradient tolerance -1: Tolerance must be positive.");
    }
}
