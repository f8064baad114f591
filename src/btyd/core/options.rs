//! options — configuration for fitting and lifetime-value workflows.
//!
//! Purpose
//! -------
//! Collect the fitting knobs ([`FitOptions`]) and the lifetime-value knobs
//! ([`ClvOptions`]) in one place so call sites pass explicit, validated
//! configuration instead of loose arguments.
//!
//! Key behaviors
//! -------------
//! - [`FitOptions::default`] gives an unpenalized single-start fit with the
//!   default optimizer options, 95% confidence intervals and the training
//!   data kept on the result.
//! - `with_*` builders validate each field and return
//!   [`BtydError::InvalidOption`] for out-of-range values.
//! - [`ClvOptions`] carries the horizon in months, the per-month discount
//!   rate and the unit the frequency model was fitted in.
//!
//! Invariants & assumptions
//! ------------------------
//! - `penalizer ≥ 0`, `iterative_fitting ≥ 1`, `restart_jitter ≥ 0`,
//!   `confidence_level ∈ (0, 1)`; all finite.
//! - `initial_params` are model-space values in the caller's time units;
//!   their length is checked against the model layout by the fitter.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the documented defaults and each builder's rejection
//!   path.
use crate::{
    btyd::{
        core::units::TimeUnit,
        errors::{BtydError, BtydResult},
    },
    inference::DEFAULT_CONFIDENCE_LEVEL,
    optimization::loglik_optimizer::MLEOptions,
};

/// FitOptions — configuration of one penalized-MLE fit.
///
/// Fields
/// ------
/// - `penalizer`: `λ` in `λ · W · Σ p²`.
/// - `mle`: optimizer tolerances, line search and Nelder–Mead fallback.
/// - `iterative_fitting`: number of optimizer starts; starts after the
///   first jitter the initial θ and the best objective wins.
/// - `restart_jitter`: standard deviation of the Normal jitter added to θ
///   for restarts.
/// - `seed`: RNG seed for restart jitter.
/// - `confidence_level`: two-sided level of the reported intervals.
/// - `initial_params`: optional model-space starting values in layout order.
/// - `keep_data`: store the training data on the fit result.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub penalizer: f64,
    pub mle: MLEOptions,
    pub iterative_fitting: usize,
    pub restart_jitter: f64,
    pub seed: u64,
    pub confidence_level: f64,
    pub initial_params: Option<Vec<f64>>,
    pub keep_data: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            penalizer: 0.0,
            mle: MLEOptions::default(),
            iterative_fitting: 1,
            restart_jitter: 0.5,
            seed: 0,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            initial_params: None,
            keep_data: true,
        }
    }
}

fn invalid(option: &'static str, value: f64, reason: &'static str) -> BtydError {
    BtydError::InvalidOption { option, value, reason }
}

impl FitOptions {
    /// Set the L2 penalty coefficient.
    ///
    /// # Errors
    /// - `BtydError::InvalidOption` unless `penalizer` is finite and `≥ 0`.
    pub fn with_penalizer(mut self, penalizer: f64) -> BtydResult<Self> {
        if !penalizer.is_finite() || penalizer < 0.0 {
            return Err(invalid("penalizer", penalizer, "must be finite and non-negative"));
        }
        self.penalizer = penalizer;
        Ok(self)
    }

    pub fn with_mle(mut self, mle: MLEOptions) -> Self {
        self.mle = mle;
        self
    }

    /// Set the number of starts and the restart jitter.
    ///
    /// # Errors
    /// - `BtydError::InvalidOption` if `starts == 0` or `jitter` is negative
    ///   or not finite.
    pub fn with_restarts(mut self, starts: usize, jitter: f64, seed: u64) -> BtydResult<Self> {
        if starts == 0 {
            return Err(invalid("iterative_fitting", 0.0, "at least one start is required"));
        }
        if !jitter.is_finite() || jitter < 0.0 {
            return Err(invalid("restart_jitter", jitter, "must be finite and non-negative"));
        }
        self.iterative_fitting = starts;
        self.restart_jitter = jitter;
        self.seed = seed;
        Ok(self)
    }

    /// # Errors
    /// - `BtydError::InvalidOption` unless `0 < level < 1`.
    pub fn with_confidence_level(mut self, level: f64) -> BtydResult<Self> {
        if !(level > 0.0 && level < 1.0) {
            return Err(invalid("confidence_level", level, "must lie strictly between 0 and 1"));
        }
        self.confidence_level = level;
        Ok(self)
    }

    /// Start the optimizer from explicit model-space values.
    ///
    /// # Errors
    /// - `BtydError::InvalidOption` for an empty vector or a non-finite
    ///   entry. Domain checks (positivity) happen in the fitter.
    pub fn with_initial_params(mut self, values: Vec<f64>) -> BtydResult<Self> {
        if values.is_empty() {
            return Err(invalid("initial_params", 0.0, "must not be empty"));
        }
        if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(invalid("initial_params", bad, "entries must be finite"));
        }
        self.initial_params = Some(values);
        Ok(self)
    }

    pub fn with_keep_data(mut self, keep_data: bool) -> Self {
        self.keep_data = keep_data;
        self
    }
}

/// ClvOptions — horizon and discounting for customer lifetime value.
///
/// Fields
/// ------
/// - `time`: horizon in months; one discounting step per month.
/// - `discount_rate`: monthly discount rate.
/// - `freq`: unit the frequency model's time columns were measured in.
///
/// Default: 12 months, 1% per month, days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClvOptions {
    pub time: usize,
    pub discount_rate: f64,
    pub freq: TimeUnit,
}

impl Default for ClvOptions {
    fn default() -> Self {
        Self { time: 12, discount_rate: 0.01, freq: TimeUnit::Days }
    }
}

impl ClvOptions {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidOption` if `discount_rate` is not finite or is
    ///   `≤ -1`.
    pub fn new(time: usize, discount_rate: f64, freq: TimeUnit) -> BtydResult<Self> {
        if !discount_rate.is_finite() || discount_rate <= -1.0 {
            return Err(invalid("discount_rate", discount_rate, "must be finite and above -1"));
        }
        Ok(Self { time, discount_rate, freq })
    }
}
