//! special_functions — numeric kernels shared by every model likelihood.
//!
//! Purpose
//! -------
//! Provide stable scalar implementations of the special functions that the
//! buy-till-you-die likelihoods and predictive formulas are built from:
//! log-sum-exp (plain and signed), the Gauss hypergeometric function in log
//! space, and gamma/beta family functions.
//!
//! Key behaviors
//! -------------
//! - Every kernel is a pure function of `f64` scalars; array callers map over
//!   their inputs elementwise.
//! - Invalid or non-finite inputs propagate as `NaN` rather than panicking or
//!   returning an error, so the optimizer can penalize and move away from such
//!   regions.
//! - Series evaluation is bounded (see
//!   [`hypergeometric::HYP2F1_MAX_TERMS`]); on cap exhaustion the partial sum
//!   is returned.
//!
//! Downstream usage
//! ----------------
//! - `btyd::models` builds per-subject log-likelihoods from these kernels.
//! - Callers typically `use crate::special_functions::prelude::*`.

pub mod gamma_beta;
pub mod hypergeometric;
pub mod log_sum_exp;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::gamma_beta::{ln_beta, ln_factorial, ln_gamma, regularized_incomplete_beta};
pub use self::hypergeometric::{hyp2f1, log_hyp2f1, scaled_gamma_tail};
pub use self::log_sum_exp::{log_add_exp, log_sum_exp, signed_log_sum_exp};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::gamma_beta::{ln_beta, ln_factorial, ln_gamma, regularized_incomplete_beta};
    pub use super::hypergeometric::{hyp2f1, log_hyp2f1, scaled_gamma_tail};
    pub use super::log_sum_exp::{log_add_exp, log_sum_exp, signed_log_sum_exp};
}
