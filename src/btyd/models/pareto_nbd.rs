//! Pareto/NBD — Poisson purchases with exponential lifetimes.
//!
//! Purpose
//! -------
//! Continuous-time purchase model: while alive a customer buys at rate
//! `λ ~ Gamma(r, α)`; the lifetime is exponential with rate
//! `μ ~ Gamma(s, β)`.
//!
//! Key behaviors
//! -------------
//! - [`ParetoNbd`] implements [`BtydModel`] with parameters `(r, α, s, β)`;
//!   both `α` and `β` are time rates and are rescaled by the fitter.
//! - [`ParetoNbdParams`] implements [`PurchaseModel`] and adds the
//!   conditional purchase-count pmf
//!   [`ParetoNbdParams::conditional_probability_of_n_purchases_up_to_time`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The likelihood's `A₀` term is a difference of two hypergeometric
//!   products. It is combined with a signed log-sum-exp; a non-positive
//!   difference (cancellation at `t_x = T` or underflow) maps to `ln 0`.
//! - `α < β` and `α ≥ β` use the two mirrored series so the
//!   hypergeometric argument stays in `[0, 1)`.
//! - `s = 1` is handled through the limit `(1 - q^(s-1))/(s-1) → -ln q`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover a reference `P(alive)` and conditional expectation,
//!   the overflow regime of `A₀` with very large frequencies, smoothness of
//!   the conditional expectation in frequency, and normalization of both
//!   pmfs.
use crate::{
    btyd::{
        core::{
            data::SummaryData,
            params::{ModelParams, ParamSpec, ParamVector, positive_param},
        },
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, ModelKind, PurchaseModel},
    },
    special_functions::{
        gamma_beta::{ln_beta, ln_factorial, ln_gamma},
        hypergeometric::log_hyp2f1,
        log_sum_exp::{log_add_exp, signed_log_sum_exp},
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Pareto/NBD model descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParetoNbd;

/// Fitted Pareto/NBD parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParetoNbdParams {
    pub r: f64,
    pub alpha: f64,
    pub s: f64,
    pub beta: f64,
}

/// Below this distance from 1, `s` is treated as exactly 1.
const UNIT_SHAPE_TOL: f64 = 1e-10;

impl ParetoNbdParams {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidParams` if any value is not finite and positive.
    pub fn new(r: f64, alpha: f64, s: f64, beta: f64) -> BtydResult<Self> {
        Ok(Self {
            r: positive_param("r", r)?,
            alpha: positive_param("alpha", alpha)?,
            s: positive_param("s", s)?,
            beta: positive_param("beta", beta)?,
        })
    }

    /// log_a0 — `ln A₀(x, t_x, T)`, the "died between t_x and T" term.
    ///
    /// Returns
    /// -------
    /// `f64`
    ///   `ln A₀`, `-∞` when the difference of the two series is not
    ///   positive (e.g. `t_x == T`).
    pub fn log_a0(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        let Self { r, alpha, s, beta } = *self;
        let (max_rate, shape) = if alpha < beta { (beta, r + frequency) } else { (alpha, s + 1.0) };
        let rsf = r + s + frequency;
        let gap = (alpha - beta).abs();
        let q1 = max_rate + recency;
        let q2 = max_rate + age;
        let log_p1 = log_hyp2f1(rsf, shape, rsf + 1.0, gap / q1);
        let log_p2 = log_hyp2f1(rsf, shape, rsf + 1.0, gap / q2);
        let (log_diff, sign) =
            signed_log_sum_exp(&[log_p1 + rsf * q2.ln(), log_p2 + rsf * q1.ln()], &[1.0, -1.0]);
        if sign.is_nan() {
            return f64::NAN;
        }
        if sign <= 0.0 {
            return f64::NEG_INFINITY;
        }
        log_diff - rsf * (q1.ln() + q2.ln())
    }

    /// Per-subject log-likelihood.
    pub fn log_likelihood(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        let Self { r, alpha, s, beta } = *self;
        let x = frequency;
        let alive = -(r + x) * (alpha + age).ln() - s * (beta + age).ln();
        let died = s.ln() + self.log_a0(x, recency, age) - (r + s + x).ln();
        ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln() + s * beta.ln() + log_add_exp(alive, died)
    }

    /// `P(X(t) = n)` for a new customer, without the `t ≤ 0` shortcut.
    fn pmf(&self, t: f64, n: u32) -> f64 {
        let Self { r, alpha, s, beta } = *self;
        let nf = f64::from(n);
        let mut log_first = ln_gamma(r + nf) - ln_gamma(r) - ln_factorial(nf)
            + r * (alpha / (alpha + t)).ln()
            + s * (beta / (beta + t)).ln();
        if n > 0 {
            log_first += nf * (t / (alpha + t)).ln();
        }

        let (max_rate, shape) = if alpha >= beta { (alpha, s + 1.0) } else { (beta, r + nf) };
        let gap = (alpha - beta).abs();
        let c = r + s + nf + 1.0;
        let mut terms = Vec::with_capacity(n as usize + 2);
        let mut signs = Vec::with_capacity(n as usize + 2);
        terms.push(log_hyp2f1(r + s, shape, c, gap / max_rate) - (r + s) * max_rate.ln());
        signs.push(1.0);
        for i in 0..=n {
            let fi = f64::from(i);
            let mut log_coef = ln_gamma(r + s + fi) - ln_gamma(r + s) - ln_factorial(fi);
            if i > 0 {
                log_coef += fi * t.ln();
            }
            let log_tail = log_hyp2f1(r + s + fi, shape, c, gap / (max_rate + t))
                - (r + s + fi) * (max_rate + t).ln();
            terms.push(log_coef + log_tail);
            signs.push(-1.0);
        }
        let (log_bracket, sign) = signed_log_sum_exp(&terms, &signs);
        let second = if sign > 0.0 {
            (r * alpha.ln() + s * beta.ln() + ln_beta(r + nf, s + 1.0) - ln_beta(r, s)
                + log_bracket)
                .exp()
        } else {
            0.0
        };
        log_first.exp() + second
    }

    /// conditional_probability_of_n_purchases_up_to_time — `P(X(T, T+t] = n | x, t_x, T)`.
    ///
    /// Parameters
    /// ----------
    /// - `n`: `u32`
    ///   Number of future purchases.
    /// - `t`: `f64`
    ///   Future horizon length.
    /// - `frequency`, `recency`, `age`: `f64`
    ///   The customer's history `(x, t_x, T)`.
    ///
    /// Returns
    /// -------
    /// `f64`
    ///   A pmf over `n`: an alive customer behaves like a new one with
    ///   posterior parameters `(r + x, α + T, s, β + T)`; an inactive one
    ///   buys nothing.
    pub fn conditional_probability_of_n_purchases_up_to_time(
        &self, n: u32, t: f64, frequency: f64, recency: f64, age: f64,
    ) -> f64 {
        let p_alive = self.conditional_probability_alive(frequency, recency, age);
        let posterior = Self {
            r: self.r + frequency,
            alpha: self.alpha + age,
            s: self.s,
            beta: self.beta + age,
        };
        let alive_part = p_alive * posterior.probability_of_n_purchases_up_to_time(t, n);
        if n == 0 { alive_part + (1.0 - p_alive) } else { alive_part }
    }
}

/// `(1 - q^(s-1)) / (s - 1)` from `ln q`, with the `s → 1` limit `-ln q`.
fn shape_ratio(s: f64, log_q: f64) -> f64 {
    let k = s - 1.0;
    if k.abs() < UNIT_SHAPE_TOL { -log_q } else { -(k * log_q).exp_m1() / k }
}

impl ModelParams for ParetoNbdParams {
    fn to_vector(&self) -> ParamVector {
        ParamVector::from_pairs([("r", self.r), ("alpha", self.alpha), ("s", self.s), ("beta", self.beta)])
    }

    fn from_vector(vector: &ParamVector) -> BtydResult<Self> {
        match vector.unload(&["r", "alpha", "s", "beta"])?.as_slice() {
            &[r, alpha, s, beta] => Self::new(r, alpha, s, beta),
            other => Err(BtydError::ParamCountMismatch { expected: 4, found: other.len() }),
        }
    }
}

impl BtydModel for ParetoNbd {
    type Data = SummaryData;
    type Params = ParetoNbdParams;

    const KIND: ModelKind = ModelKind::ParetoNbd;

    fn param_specs(&self, _data: &SummaryData) -> Vec<ParamSpec> {
        vec![
            ParamSpec::positive("r"),
            ParamSpec::time_scaled("alpha"),
            ParamSpec::positive("s"),
            ParamSpec::time_scaled("beta"),
        ]
    }

    fn log_likelihood_terms(&self, params: &ParetoNbdParams, data: &SummaryData) -> Array1<f64> {
        data.rows().map(|(x, t_x, age)| params.log_likelihood(x, t_x, age)).collect()
    }
}

impl PurchaseModel for ParetoNbdParams {
    /// `E[X(t)] = rβ/α · (1 - (β/(β+t))^(s-1)) / (s-1)`.
    fn expected_number_of_purchases_up_to_time(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { r, alpha, s, beta } = *self;
        r * beta / alpha * shape_ratio(s, (beta / (beta + t)).ln())
    }

    fn conditional_expected_number_of_purchases_up_to_time(
        &self, t: f64, frequency: f64, recency: f64, age: f64,
    ) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { r, alpha, s, beta } = *self;
        let x = frequency;
        let log_alive = ln_gamma(r + x) - ln_gamma(r) + r * alpha.ln() + s * beta.ln()
            - (r + x) * (alpha + age).ln()
            - s * (beta + age).ln();
        let log_rate = (r + x).ln() + (beta + age).ln() - (alpha + age).ln();
        let ratio = shape_ratio(s, ((beta + age) / (beta + age + t)).ln());
        (log_alive + log_rate + ratio.ln() - self.log_likelihood(x, recency, age)).exp()
    }

    fn conditional_probability_alive(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        let Self { r, alpha, s, beta } = *self;
        let x = frequency;
        let log_odds = s.ln() - (r + s + x).ln()
            + (r + x) * (alpha + age).ln()
            + s * (beta + age).ln()
            + self.log_a0(x, recency, age);
        (-log_add_exp(0.0, log_odds)).exp()
    }

    fn probability_of_n_purchases_up_to_time(&self, t: f64, n: u32) -> f64 {
        if t <= 0.0 {
            return if n == 0 { 1.0 } else { 0.0 };
        }
        self.pmf(t, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Reference `P(alive)`, conditional and unconditional expectations.
    // - Overflow and underflow regimes of `A₀` and the conditional
    //   expectation.
    // - Normalization of the unconditional and conditional pmfs for both
    //   orderings of α and β.
    // -------------------------------------------------------------------------

    fn reference() -> ParetoNbdParams {
        ParetoNbdParams::new(0.5534, 10.5802, 0.6061, 11.6562).expect("valid params")
    }

    #[test]
    // Purpose
    // -------
    // Predictions match reference values for a typical customer.
    //
    // Given
    // -----
    // - Reference parameters; (x, t_x, T) = (26, 30.86, 31).
    //
    // Expect
    // ------
    // - P(alive) ≈ 0.9979, E[X(52) | history] ≈ 25.455, E[X(1)] ≈ 0.0510.
    fn reference_predictions() {
        let params = reference();
        assert_abs_diff_eq!(params.conditional_probability_alive(26.0, 30.86, 31.0), 0.9979, epsilon = 1e-3);
        assert_abs_diff_eq!(
            params.conditional_expected_number_of_purchases_up_to_time(52.0, 26.0, 30.86, 31.0),
            25.4549,
            epsilon = 1e-3
        );
        assert_abs_diff_eq!(params.expected_number_of_purchases_up_to_time(1.0), 0.0510045, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Very large frequencies neither overflow `A₀` nor push `P(alive)`
    // outside [0, 1].
    //
    // Given
    // -----
    // - (r, α, s, β) = (10.465, 0.00798565181, 3.0516, 2.820); frequencies
    //   400/500 and 40/50 with recency in {5, 1, 4}, age in {6, 37, 37}.
    //
    // Expect
    // ------
    // - `ln A₀` finite and negative; `P(alive)` finite in [0, 1].
    fn large_frequency_regime_is_stable() {
        // Arrange
        let params = ParetoNbdParams::new(10.465, 7.98565181e-03, 3.0516, 2.820).expect("valid");
        let histories = [(5.0, 6.0), (1.0, 37.0), (4.0, 37.0)];

        // Act + Assert
        for ((t_x, age), x) in histories.iter().zip([400.0, 500.0, 500.0]) {
            let log_a0 = params.log_a0(x, *t_x, *age);
            assert!(log_a0.is_finite() && log_a0 < 0.0, "x={x}: {log_a0}");
        }
        for ((t_x, age), x) in histories.iter().zip([40.0, 50.0, 50.0]) {
            let p = params.conditional_probability_alive(x, *t_x, *age);
            assert!(p.is_finite() && (0.0..=1.0).contains(&p), "x={x}: {p}");
        }
    }

    #[test]
    // Purpose
    // -------
    // The conditional expectation moves smoothly with frequency for long,
    // old histories where naive products underflow.
    //
    // Given
    // -----
    // - (r, α, s, β) = (0.55, 10.58, 0.61, 11.67); t = 10, t_x = T = 200,
    //   x = 132 and 133.
    //
    // Expect
    // ------
    // - Values within 0.05 of each other, both ≈ 6.2.
    fn conditional_expectation_does_not_underflow() {
        let params = ParetoNbdParams::new(0.55, 10.58, 0.61, 11.67).expect("valid");
        let lo = params.conditional_expected_number_of_purchases_up_to_time(10.0, 132.0, 200.0, 200.0);
        let hi = params.conditional_expected_number_of_purchases_up_to_time(10.0, 133.0, 200.0, 200.0);
        assert!((lo - hi).abs() < 0.05, "{lo} vs {hi}");
        assert_abs_diff_eq!(lo, 6.206, epsilon = 1e-2);
    }

    #[test]
    // Purpose
    // -------
    // The unconditional pmf is normalized for α ≥ β and α < β, and the
    // conditional pmf is normalized for a typical history.
    //
    // Given
    // -----
    // - Reference parameters and a copy with α = 3; t = 30; n = 0..400.
    //
    // Expect
    // ------
    // - Each sum within 1e-6 of 1.
    fn pmfs_are_normalized() {
        let params = reference();
        let swapped = ParetoNbdParams { alpha: 3.0, ..params };
        for p in [params, swapped] {
            let total: f64 = (0..400).map(|n| p.probability_of_n_purchases_up_to_time(30.0, n)).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
        }
        let total: f64 = (0..400)
            .map(|n| params.conditional_probability_of_n_purchases_up_to_time(n, 30.0, 5.0, 20.0, 31.0))
            .sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // An empty history leaves the customer certainly alive and the
    // conditional expectation equal to the unconditional one.
    //
    // Given
    // -----
    // - (x, t_x, T) = (0, 0, 0), t = 20.
    //
    // Expect
    // ------
    // - P(alive) = 1 within 1e-12; expectations equal within 1e-9.
    fn empty_history_reduces_to_prior() {
        let params = reference();
        assert_abs_diff_eq!(params.conditional_probability_alive(0.0, 0.0, 0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            params.conditional_expected_number_of_purchases_up_to_time(20.0, 0.0, 0.0, 0.0),
            params.expected_number_of_purchases_up_to_time(20.0),
            epsilon = 1e-9
        );
    }

    #[test]
    // Purpose
    // -------
    // `s = 1` uses the logarithmic limit instead of dividing by zero.
    //
    // Given
    // -----
    // - s = 1 exactly and s = 1 ± 1e-7.
    //
    // Expect
    // ------
    // - Finite `E[X(10)]`, continuous across s = 1.
    fn unit_shape_limit_is_continuous() {
        let base = reference();
        let at_one = ParetoNbdParams { s: 1.0, ..base }.expected_number_of_purchases_up_to_time(10.0);
        let below = ParetoNbdParams { s: 1.0 - 1e-7, ..base }.expected_number_of_purchases_up_to_time(10.0);
        let above = ParetoNbdParams { s: 1.0 + 1e-7, ..base }.expected_number_of_purchases_up_to_time(10.0);
        assert!(at_one.is_finite());
        assert_abs_diff_eq!(at_one, below, epsilon = 1e-6);
        assert_abs_diff_eq!(at_one, above, epsilon = 1e-6);
    }
}
