//! btyd — buy-till-you-die customer models: data, fitting, prediction, CLV.
//!
//! Purpose
//! -------
//! Bundle the customer-base layer of the crate under one namespace: validated
//! summary data, the six probabilistic models, the penalized MLE fitter,
//! lifetime-value helpers, JSON persistence and seeded simulators. This is
//! the surface most consumers should depend on.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds data containers, parameter vectors and transforms, fit
//!   and CLV options, the [`FitResult`] and time units.
//! - [`models`] defines BG/NBD, MBG/NBD, Pareto/NBD, BG/BB, Gamma-Gamma and
//!   BG/NBD with covariates, each as a descriptor implementing
//!   [`BtydModel`] plus a parameter struct with the predictive formulas.
//! - [`fitter::fit`] rescales time, maximizes the weighted, penalized
//!   log-likelihood with restarts and attaches Hessian-based diagnostics.
//! - [`clv`] discounts monthly expected purchases into lifetime value.
//! - [`persistence`] saves and restores fitted results as JSON.
//! - [`simulate`] draws synthetic populations from fitted parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - Data containers are validated on construction; models never see NaN,
//!   negative counts or `recency > age`.
//! - Parameters held by a [`FitResult`] are in the caller's time units; the
//!   internal scale factor never leaks into predictions.
//! - Errors surface as [`BtydError`]; optimizer and inference failures are
//!   wrapped, not flattened.
//!
//! Conventions
//! -----------
//! - Time arguments of predictive methods use the units of the fitted data.
//!   BG/BB counts discrete transaction opportunities instead.
//! - The fitter logs through the `log` facade (`info!` per fit, `debug!`
//!   per start, `warn!` for non-convergence or missing diagnostics); no
//!   other module logs.
//!
//! Downstream usage
//! ----------------
//! - Typical flow:
//!   1. Build [`SummaryData`] (or [`MonetaryData`] / [`CovariateData`]).
//!   2. `fit(&BetaGeo, &data, &FitOptions::default())`.
//!   3. Predict with `result.params` through [`PurchaseModel`].
//!   4. Value customers with [`customer_lifetime_value`] and persist with
//!      [`save_model`].
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests; `tests/` exercises complete
//!   pipelines on reference data and simulated populations.

pub mod clv;
pub mod core;
pub mod errors;
pub mod fitter;
pub mod models;
pub mod persistence;
pub mod simulate;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::clv::customer_lifetime_value;
pub use self::core::{
    ClvOptions, CovariateData, FitData, FitOptions, FitResult, MonetaryData, ParamVector,
    SummaryData, TimeUnit,
};
pub use self::errors::{BtydError, BtydResult};
pub use self::fitter::fit;
pub use self::models::{
    BetaGeo, BetaGeoBetaBinom, BetaGeoBetaBinomParams, BetaGeoCovariateParams, BetaGeoCovariates,
    BetaGeoParams, BtydModel, GammaGamma, GammaGammaParams, ModelKind, ModifiedBetaGeo,
    ModifiedBetaGeoParams, ParetoNbd, ParetoNbdParams, PurchaseModel,
};
pub use self::persistence::{from_json, load_model, read_kind, save_model, to_json};
pub use self::simulate::{
    simulate_beta_geo, simulate_beta_geo_beta_binom, simulate_modified_beta_geo,
    simulate_pareto_nbd,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_btyd::btyd::prelude::*;
//
// to import data, models, the fitter and CLV in a single line.

pub mod prelude {
    pub use super::{
        BetaGeo, BetaGeoBetaBinom, BetaGeoCovariates, BtydError, BtydModel, BtydResult,
        ClvOptions, CovariateData, FitOptions, FitResult, GammaGamma, ModifiedBetaGeo,
        MonetaryData, ParetoNbd, PurchaseModel, SummaryData, TimeUnit, customer_lifetime_value,
        fit, load_model, save_model,
    };
}
