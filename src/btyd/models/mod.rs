//! models — the six buy-till-you-die models and their shared contracts.
//!
//! Purpose
//! -------
//! Collect the model descriptors (what the fitter optimizes) and the fitted
//! parameter structs (what callers predict with). Every model implements
//! [`BtydModel`]; purchase-frequency parameter structs also implement
//! [`PurchaseModel`].
//!
//! Key behaviors
//! -------------
//! - [`BetaGeo`], [`ModifiedBetaGeo`], [`ParetoNbd`] and [`BetaGeoBetaBinom`]
//!   fit on [`SummaryData`](crate::btyd::core::data::SummaryData).
//! - [`GammaGamma`] fits spend on
//!   [`MonetaryData`](crate::btyd::core::data::MonetaryData).
//! - [`BetaGeoCovariates`] fits on
//!   [`CovariateData`](crate::btyd::core::data::CovariateData) and predicts
//!   per subject through [`BetaGeoCovariateParams::for_subject`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-subject log-likelihoods are unweighted; weighting, penalization and
//!   time scaling belong to the fitter.
//! - Predictive formulas take time arguments in the units of the data the
//!   parameters were fitted on.
//!
//! Testing notes
//! -------------
//! - Each model file checks its formulas against reference values and
//!   internal identities (pmf normalization, `Σ n P(n) = E[X(t)]`,
//!   probabilities in `[0, 1]`).

pub mod beta_geo;
pub mod beta_geo_beta_binom;
pub mod beta_geo_covariates;
pub mod gamma_gamma;
pub mod modified_beta_geo;
pub mod pareto_nbd;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::beta_geo::{BetaGeo, BetaGeoParams};
pub use self::beta_geo_beta_binom::{BetaGeoBetaBinom, BetaGeoBetaBinomParams};
pub use self::beta_geo_covariates::{BetaGeoCovariateParams, BetaGeoCovariates};
pub use self::gamma_gamma::{GammaGamma, GammaGammaParams};
pub use self::modified_beta_geo::{ModifiedBetaGeo, ModifiedBetaGeoParams};
pub use self::pareto_nbd::{ParetoNbd, ParetoNbdParams};
pub use self::traits::{BtydModel, ModelKind, PurchaseModel};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_btyd::btyd::models::prelude::*;
//
// to import every model and its parameter struct in a single line.

pub mod prelude {
    pub use super::beta_geo::{BetaGeo, BetaGeoParams};
    pub use super::beta_geo_beta_binom::{BetaGeoBetaBinom, BetaGeoBetaBinomParams};
    pub use super::beta_geo_covariates::{BetaGeoCovariateParams, BetaGeoCovariates};
    pub use super::gamma_gamma::{GammaGamma, GammaGammaParams};
    pub use super::modified_beta_geo::{ModifiedBetaGeo, ModifiedBetaGeoParams};
    pub use super::pareto_nbd::{ParetoNbd, ParetoNbdParams};
    pub use super::traits::{BtydModel, ModelKind, PurchaseModel};
}
