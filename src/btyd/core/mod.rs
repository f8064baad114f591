//! core — data, parameters, options and results shared by every model.
//!
//! Purpose
//! -------
//! Hold the model-agnostic building blocks of the buy-till-you-die layer:
//! validated data containers, named parameter vectors and their transforms,
//! fit and lifetime-value options, the fit result, time units and input
//! validation helpers.
//!
//! Key behaviors
//! -------------
//! - [`SummaryData`], [`MonetaryData`] and [`CovariateData`] validate their
//!   columns on construction and implement [`FitData`] for the fitter.
//! - [`ParamSpec`] ties each parameter name to its optimizer transform and
//!   to whether it carries a time dimension.
//! - [`FitResult`] is the immutable output of a fit.
//!
//! Invariants & assumptions
//! ------------------------
//! - Containers never hold NaN/Inf, negative counts or `recency > age`.
//! - Parameter vectors keep layout order; lookups are by name.

pub mod data;
pub mod fit_result;
pub mod options;
pub mod params;
pub mod units;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::data::{CovariateData, FitData, MonetaryData, SummaryData};
pub use self::fit_result::FitResult;
pub use self::options::{ClvOptions, FitOptions};
pub use self::params::{ModelParams, ParamSpec, ParamVector};
pub use self::units::{TimeUnit, parse_time_unit};
pub use self::validation::{median, time_scale};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_btyd::btyd::core::prelude::*;
//
// to import the data containers, options and results in a single line.

pub mod prelude {
    pub use super::data::{CovariateData, FitData, MonetaryData, SummaryData};
    pub use super::fit_result::FitResult;
    pub use super::options::{ClvOptions, FitOptions};
    pub use super::params::{ModelParams, ParamVector};
    pub use super::units::TimeUnit;
}
