//! clv — discounted customer lifetime value from any purchase model.
//!
//! Purpose
//! -------
//! Combine a purchase-frequency model's conditional expectations with a
//! per-customer value per transaction into a present value over a monthly
//! horizon.
//!
//! Key behaviors
//! -------------
//! - For month `k = 1..=time`, the expected purchases in that month are
//!   `E[X(kF) | h] - E[X((k-1)F) | h]` with `F` the number of model time
//!   units per month; each month is discounted by `(1 + d)^k`.
//! - [`customer_lifetime_value`] accepts any [`PurchaseModel`], including
//!   trait objects.
//! - [`GammaGammaParams::customer_lifetime_value`] first replaces observed
//!   spend by the conditional expected average profit.
//! - [`BetaGeoCovariateParams::customer_lifetime_value`] uses each
//!   subject's individual parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - Monetary values are aligned row by row with the summary data.
//! - Time arguments are in the units the purchase model was fitted in;
//!   [`ClvOptions::freq`] states what those units are.
//!
//! Testing notes
//! -------------
//! - Unit tests check the undiscounted telescoping identity, discount
//!   monotonicity, agreement of the spend-adjusted path with the generic one
//!   and length validation.
use crate::btyd::{
    core::{
        data::{CovariateData, SummaryData},
        options::ClvOptions,
        validation::validate_length,
    },
    errors::BtydResult,
    models::{
        beta_geo_covariates::BetaGeoCovariateParams, gamma_gamma::GammaGammaParams,
        traits::PurchaseModel,
    },
};
use ndarray::Array1;

/// Present value of one customer given its cumulative expectation curve.
///
/// `cumulative(t)` must return `E[X(t) | history]` with `cumulative(0) = 0`.
pub fn discounted_value<F: Fn(f64) -> f64>(
    cumulative: F, monetary_value: f64, options: &ClvOptions,
) -> f64 {
    let factor = options.freq.periods_per_month();
    let mut previous = 0.0;
    let mut total = 0.0;
    for month in 1..=options.time {
        let current = cumulative(month as f64 * factor);
        let expected = current - previous;
        total += monetary_value * expected / (1.0 + options.discount_rate).powi(month as i32);
        previous = current;
    }
    total
}

/// customer_lifetime_value — discounted value of future purchases.
///
/// Parameters
/// ----------
/// - `model`: `&P`
///   Any fitted purchase model (`BetaGeoParams`, `ParetoNbdParams`, ... or a
///   `&dyn PurchaseModel`).
/// - `data`: `&SummaryData`
///   Customer histories.
/// - `monetary_value`: `&Array1<f64>`
///   Value per transaction, one entry per customer.
/// - `options`: `&ClvOptions`
///   Horizon in months, monthly discount rate and model time unit.
///
/// Returns
/// -------
/// `BtydResult<Array1<f64>>`
///   Present value per customer.
///
/// Errors
/// ------
/// - `BtydError::LengthMismatch` if `monetary_value` is not aligned with
///   `data`.
pub fn customer_lifetime_value<P: PurchaseModel + ?Sized>(
    model: &P, data: &SummaryData, monetary_value: &Array1<f64>, options: &ClvOptions,
) -> BtydResult<Array1<f64>> {
    validate_length("monetary_value", data.frequency.len(), monetary_value.len())?;
    Ok(data
        .rows()
        .zip(monetary_value.iter())
        .map(|((x, t_x, age), &m)| {
            discounted_value(
                |t| model.conditional_expected_number_of_purchases_up_to_time(t, x, t_x, age),
                m,
                options,
            )
        })
        .collect())
}

impl GammaGammaParams {
    /// CLV with spend replaced by `E[M | x, m]`.
    ///
    /// `monetary_value` holds observed average spend, aligned with `data`;
    /// customers without repeat purchases are valued at the population
    /// mean spend.
    ///
    /// # Errors
    /// - `BtydError::LengthMismatch` for misaligned `monetary_value`.
    pub fn customer_lifetime_value<P: PurchaseModel + ?Sized>(
        &self, transaction_model: &P, data: &SummaryData, monetary_value: &Array1<f64>,
        options: &ClvOptions,
    ) -> BtydResult<Array1<f64>> {
        validate_length("monetary_value", data.frequency.len(), monetary_value.len())?;
        let adjusted: Array1<f64> = data
            .frequency
            .iter()
            .zip(monetary_value.iter())
            .map(|(&x, &m)| self.conditional_expected_average_profit(x, m))
            .collect();
        customer_lifetime_value(transaction_model, data, &adjusted, options)
    }
}

impl BetaGeoCovariateParams {
    /// CLV where each customer's expectation curve uses its own parameters.
    ///
    /// # Errors
    /// - `BtydError::LengthMismatch` for misaligned `monetary_value`.
    /// - `BtydError::CovariateWidth` if `data` has other covariate counts
    ///   than the fitted coefficients.
    pub fn customer_lifetime_value(
        &self, data: &CovariateData, monetary_value: &Array1<f64>, options: &ClvOptions,
    ) -> BtydResult<Array1<f64>> {
        validate_length("monetary_value", data.summary.frequency.len(), monetary_value.len())?;
        data.summary
            .rows()
            .enumerate()
            .map(|(i, (x, t_x, age))| {
                let individual = self.for_subject(
                    data.transaction_covariates.row(i),
                    data.dropout_covariates.row(i),
                )?;
                Ok(discounted_value(
                    |t| individual.conditional_expected_number_of_purchases_up_to_time(t, x, t_x, age),
                    monetary_value[i],
                    options,
                ))
            })
            .collect()
    }
}
