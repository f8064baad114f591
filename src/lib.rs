//! rust_btyd — buy-till-you-die customer-base analysis.
//!
//! Purpose
//! -------
//! Serve as the crate root: fit probabilistic models of repeat purchasing
//! and spend to per-customer summaries, predict future transactions and
//! survival, and value customers over a discounted horizon.
//!
//! Key behaviors
//! -------------
//! - [`btyd`] is the model layer (data, BG/NBD family, Pareto/NBD, BG/BB,
//!   Gamma-Gamma, covariates, fitter, CLV, persistence, simulation).
//! - [`optimization`] maximizes log-likelihoods in an unconstrained space
//!   with argmin and maps parameters through positivity links.
//! - [`inference`] turns the curvature at the optimum into covariances,
//!   standard errors and confidence intervals.
//! - [`special_functions`] holds the log-space kernels the likelihoods are
//!   built from.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is `f64`; non-finite values never escape a
//!   validated container or a fitted result.
//! - The library never installs a logger; it emits records through `log`
//!   and leaves the backend to the application.
//!
//! Downstream usage
//! ----------------
//! - Most callers only need `use rust_btyd::btyd::prelude::*;`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; `tests/` holds end-to-end pipelines.

pub mod btyd;
pub mod inference;
pub mod optimization;
pub mod special_functions;
