//! BG/BB — beta-geometric / beta-binomial discrete-time model.
//!
//! Purpose
//! -------
//! Model discrete transaction opportunities (e.g. yearly donation drives):
//! in each period an alive customer transacts with probability
//! `p ~ Beta(α, β)` and drops out before the next opportunity with
//! probability `θ ~ Beta(γ, δ)`.
//!
//! Key behaviors
//! -------------
//! - [`BetaGeoBetaBinom`] implements [`BtydModel`] on [`SummaryData`] whose
//!   `age` column holds the number of opportunities `n`. Time is already
//!   discrete, so the fitter does not rescale it.
//! - [`BetaGeoBetaBinomParams`] implements [`PurchaseModel`] and adds
//!   probability alive `m` periods ahead and the expected number of
//!   customers with each transaction count in the first `n` periods.
//!
//! Invariants & assumptions
//! ------------------------
//! - Frequency, recency and periods are whole numbers with
//!   `x ≤ t_x ≤ n`; `check_data` rejects anything else.
//! - Purchase-count probabilities floor a non-integer horizon.
//! - The conditional expectation is evaluated as a single exponent
//!   multiplied by `-expm1(·)`, so it stays finite for long histories.
//!
//! Testing notes
//! -------------
//! - Unit tests check the pmf against the closed-form mean, bounds of the
//!   probability alive, and data validation. Reference values from the
//!   published donations data set live in the integration tests.
use crate::{
    btyd::{
        core::{
            data::SummaryData,
            params::{ModelParams, ParamSpec, ParamVector, positive_param},
            validation::validate_integral,
        },
        errors::{BtydError, BtydResult},
        models::traits::{BtydModel, ModelKind, PurchaseModel},
    },
    special_functions::{
        gamma_beta::{ln_beta, ln_factorial, ln_gamma},
        log_sum_exp::{log_add_exp, log_sum_exp},
    },
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// BG/BB model descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaGeoBetaBinom;

/// Fitted BG/BB parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaGeoBetaBinomParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

/// `ln C(n, k)` for whole numbers `0 ≤ k ≤ n`.
fn ln_binomial(n: f64, k: f64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

impl BetaGeoBetaBinomParams {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `BtydError::InvalidParams` if any value is not finite and positive.
    pub fn new(alpha: f64, beta: f64, gamma: f64, delta: f64) -> BtydResult<Self> {
        Ok(Self {
            alpha: positive_param("alpha", alpha)?,
            beta: positive_param("beta", beta)?,
            gamma: positive_param("gamma", gamma)?,
            delta: positive_param("delta", delta)?,
        })
    }

    /// Per-subject log-likelihood for `x` transactions, the last in period
    /// `t_x`, out of `n` opportunities.
    pub fn log_likelihood(&self, frequency: f64, recency: f64, periods: f64) -> f64 {
        let Self { alpha, beta, gamma, delta } = *self;
        let (x, t_x, n) = (frequency, recency, periods);
        let survived = ln_beta(alpha + x, beta + n - x) - ln_beta(alpha, beta)
            + ln_beta(gamma, delta + n)
            - ln_beta(gamma, delta);
        let gap = (n - t_x).round().max(0.0) as usize;
        let died_terms: Vec<f64> = (0..gap)
            .map(|j| {
                let j = j as f64;
                ln_beta(alpha + x, beta + t_x - x + j) + ln_beta(gamma + 1.0, delta + t_x + j)
            })
            .collect();
        let died = log_sum_exp(&died_terms) - ln_beta(gamma, delta) - ln_beta(alpha, beta);
        log_add_exp(survived, died)
    }

    /// conditional_probability_alive_in — `P(alive at period n + m | x, t_x, n)`.
    ///
    /// Parameters
    /// ----------
    /// - `m_periods_in_future`: `f64`
    ///   Periods after the last opportunity; `0` gives "alive now".
    /// - `frequency`, `recency`, `periods`: `f64`
    ///   The history `(x, t_x, n)`.
    ///
    /// Returns
    /// -------
    /// `f64`
    ///   A probability clamped to `[0, 1]`.
    pub fn conditional_probability_alive_in(
        &self, m_periods_in_future: f64, frequency: f64, recency: f64, periods: f64,
    ) -> f64 {
        let Self { alpha, beta, gamma, delta } = *self;
        let (x, n, m) = (frequency, periods, m_periods_in_future);
        let log_p = ln_beta(alpha + x, beta + n - x) - ln_beta(alpha, beta)
            + ln_beta(gamma, delta + n + m)
            - ln_beta(gamma, delta)
            - self.log_likelihood(x, recency, n);
        log_p.exp().clamp(0.0, 1.0)
    }

    /// expected_number_of_transactions_in_first_n_periods — expected head
    /// counts by transaction count.
    ///
    /// Parameters
    /// ----------
    /// - `n`: `u32`
    ///   Number of opportunities.
    /// - `population`: `f64`
    ///   Size of the cohort, typically the total weight of the data.
    ///
    /// Returns
    /// -------
    /// `Array1<f64>`
    ///   Length `n + 1`; entry `x` is `population · P(X(n) = x)`.
    pub fn expected_number_of_transactions_in_first_n_periods(
        &self, n: u32, population: f64,
    ) -> Array1<f64> {
        (0..=n).map(|x| population * self.pmf(n, x)).collect()
    }

    fn pmf(&self, n: u32, x: u32) -> f64 {
        if x > n {
            return 0.0;
        }
        let Self { alpha, beta, gamma, delta } = *self;
        let (nf, xf) = (f64::from(n), f64::from(x));
        let base_p = ln_beta(alpha, beta);
        let base_theta = ln_beta(gamma, delta);
        let mut prob = (ln_binomial(nf, xf) + ln_beta(alpha + xf, beta + nf - xf) - base_p
            + ln_beta(gamma, delta + nf)
            - base_theta)
            .exp();
        for i in x..n {
            let fi = f64::from(i);
            prob += (ln_binomial(fi, xf) + ln_beta(alpha + xf, beta + fi - xf) - base_p
                + ln_beta(gamma + 1.0, delta + fi)
                - base_theta)
                .exp();
        }
        prob
    }
}

impl ModelParams for BetaGeoBetaBinomParams {
    fn to_vector(&self) -> ParamVector {
        ParamVector::from_pairs([
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
            ("delta", self.delta),
        ])
    }

    fn from_vector(vector: &ParamVector) -> BtydResult<Self> {
        match vector.unload(&["alpha", "beta", "gamma", "delta"])?.as_slice() {
            &[alpha, beta, gamma, delta] => Self::new(alpha, beta, gamma, delta),
            other => Err(BtydError::ParamCountMismatch { expected: 4, found: other.len() }),
        }
    }
}

impl BtydModel for BetaGeoBetaBinom {
    type Data = SummaryData;
    type Params = BetaGeoBetaBinomParams;

    const KIND: ModelKind = ModelKind::BetaGeoBetaBinom;

    fn param_specs(&self, _data: &SummaryData) -> Vec<ParamSpec> {
        ["alpha", "beta", "gamma", "delta"].into_iter().map(ParamSpec::positive).collect()
    }

    fn log_likelihood_terms(
        &self, params: &BetaGeoBetaBinomParams, data: &SummaryData,
    ) -> Array1<f64> {
        data.rows().map(|(x, t_x, n)| params.log_likelihood(x, t_x, n)).collect()
    }

    /// Whole-number columns with `frequency ≤ recency`.
    fn check_data(&self, data: &SummaryData) -> BtydResult<()> {
        validate_integral("frequency", &data.frequency)?;
        validate_integral("recency", &data.recency)?;
        validate_integral("age", &data.age)?;
        for (index, (x, t_x, _)) in data.rows().enumerate() {
            if x > t_x {
                return Err(BtydError::InvalidObservation {
                    column: "frequency",
                    index,
                    value: x,
                    reason: "cannot exceed recency in discrete time",
                });
            }
        }
        Ok(())
    }

    fn scales_time(&self) -> bool {
        false
    }
}

impl PurchaseModel for BetaGeoBetaBinomParams {
    /// `E[X(n)] = α/(α+β) · δ/(γ-1) · [1 - Γ(γ+δ)Γ(1+δ+n) / (Γ(1+δ)Γ(γ+δ+n))]`.
    fn expected_number_of_purchases_up_to_time(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { alpha, beta, gamma, delta } = *self;
        let log_ratio = ln_gamma(gamma + delta) + ln_gamma(1.0 + delta + t)
            - ln_gamma(1.0 + delta)
            - ln_gamma(gamma + delta + t);
        alpha / (alpha + beta) * delta / (gamma - 1.0) * -log_ratio.exp_m1()
    }

    /// Expected transactions in the next `t` opportunities.
    fn conditional_expected_number_of_purchases_up_to_time(
        &self, t: f64, frequency: f64, recency: f64, age: f64,
    ) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let Self { alpha, beta, gamma, delta } = *self;
        let (x, n, m) = (frequency, age, t);
        let log_lik = self.log_likelihood(x, recency, n);
        let log_p2 = ln_beta(alpha + x + 1.0, beta + n - x) - ln_beta(alpha, beta);
        let log_g = ln_gamma(gamma + delta) - ln_gamma(1.0 + delta);
        let a4 = ln_gamma(1.0 + delta + n) - ln_gamma(gamma + delta + n);
        let a5 = ln_gamma(1.0 + delta + n + m) - ln_gamma(gamma + delta + n + m);
        delta / (gamma - 1.0) * -(a5 - a4).exp_m1() * (log_p2 + log_g + a4 - log_lik).exp()
    }

    fn conditional_probability_alive(&self, frequency: f64, recency: f64, age: f64) -> f64 {
        self.conditional_probability_alive_in(0.0, frequency, recency, age)
    }

    /// `P(X(n) = x)` with `n = ⌊t⌋` opportunities.
    fn probability_of_n_purchases_up_to_time(&self, t: f64, n: u32) -> f64 {
        let periods = t.max(0.0).floor() as u32;
        self.pmf(periods, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - The pmf against the closed-form mean and normalization.
    // - Probability-alive bounds and horizon monotonicity.
    // - Discrete-data validation.
    // -------------------------------------------------------------------------

    fn params() -> BetaGeoBetaBinomParams {
        BetaGeoBetaBinomParams::new(1.204, 0.750, 0.657, 2.783).expect("valid params")
    }

    #[test]
    // Purpose
    // -------
    // The pmf over `0..=n` is normalized and its mean is `E[X(n)]`.
    //
    // Given
    // -----
    // - n = 6 opportunities.
    //
    // Expect
    // ------
    // - Σ P(x) = 1 and Σ x P(x) = E[X(6)] ≈ 2.21963.
    fn pmf_normalized_with_closed_form_mean() {
        let params = params();
        let probs: Vec<f64> =
            (0..=6).map(|x| params.probability_of_n_purchases_up_to_time(6.0, x)).collect();
        let mean: f64 = probs.iter().enumerate().map(|(x, p)| x as f64 * p).sum();
        assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(mean, params.expected_number_of_purchases_up_to_time(6.0), epsilon = 1e-10);
        assert_abs_diff_eq!(mean, 2.2196314, epsilon = 1e-6);
        assert_eq!(params.probability_of_n_purchases_up_to_time(6.7, 7), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Probability alive is bounded and decreases with the look-ahead.
    //
    // Given
    // -----
    // - Histories (0, 0, 6), (2, 4, 6), (6, 6, 6); m = 0, 1, 5.
    //
    // Expect
    // ------
    // - Values in [0, 1], non-increasing in m; ≈ 0.108, 0.590, 0.930 at m = 1.
    fn probability_alive_bounds_and_horizon() {
        let params = params();
        let expected = [0.108, 0.590, 0.930];
        for ((x, t_x, n), e) in [(0.0, 0.0, 6.0), (2.0, 4.0, 6.0), (6.0, 6.0, 6.0)].into_iter().zip(expected) {
            let now = params.conditional_probability_alive(x, t_x, n);
            let next = params.conditional_probability_alive_in(1.0, x, t_x, n);
            let later = params.conditional_probability_alive_in(5.0, x, t_x, n);
            assert!((0.0..=1.0).contains(&now));
            assert!(now >= next && next >= later);
            assert_abs_diff_eq!(next, e, epsilon = 1e-3);
        }
    }

    #[test]
    // Purpose
    // -------
    // First-n-period head counts sum to the population.
    //
    // Given
    // -----
    // - n = 6 and a population of 11104.
    //
    // Expect
    // ------
    // - Seven entries summing to 11104.
    fn head_counts_sum_to_population() {
        let counts = params().expected_number_of_transactions_in_first_n_periods(6, 11104.0);
        assert_eq!(counts.len(), 7);
        assert_abs_diff_eq!(counts.sum(), 11104.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Discrete-time data must be whole numbers with `x ≤ t_x`.
    //
    // Given
    // -----
    // - Fractional recency; a frequency above recency.
    //
    // Expect
    // ------
    // - `InvalidObservation` in both cases.
    fn check_data_rejects_non_discrete_histories() {
        let fractional = SummaryData::new(array![1.0], array![1.5], array![3.0], None).expect("valid");
        assert!(matches!(
            BetaGeoBetaBinom.check_data(&fractional),
            Err(BtydError::InvalidObservation { column: "recency", .. })
        ));
        let too_many = SummaryData::new(array![3.0], array![2.0], array![3.0], None).expect("valid");
        assert!(matches!(
            BetaGeoBetaBinom.check_data(&too_many),
            Err(BtydError::InvalidObservation { column: "frequency", .. })
        ));
    }
}
