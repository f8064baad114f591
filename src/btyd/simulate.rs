//! simulate — seeded synthetic customer populations.
//!
//! Purpose
//! -------
//! Draw summary data from the generative process behind each purchase
//! model, for tests, demos and sanity checks of fitted parameters.
//!
//! Key behaviors
//! -------------
//! - BG/NBD: `λ ~ Gamma(r, α)`, `p ~ Beta(a, b)`; exponential gaps at rate
//!   `λ`, and after each repeat purchase the customer drops out with
//!   probability `p`.
//! - MBG/NBD: as BG/NBD, plus a dropout draw at time zero.
//! - Pareto/NBD: `λ ~ Gamma(r, α)`, `μ ~ Gamma(s, β)`; purchases at rate
//!   `λ` until an exponential lifetime with rate `μ` ends.
//! - BG/BB: `p ~ Beta(α, β)`, `θ ~ Beta(γ, δ)`; at each of `n` opportunities
//!   the customer first dies with probability `θ`, then transacts with
//!   probability `p`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Gamma draws use the rate parameterization of the models (scale
//!   `1/rate` in `rand_distr`).
//! - Equal seeds give identical populations.
//! - Output always satisfies the [`SummaryData`] invariants.
use crate::btyd::{
    core::data::SummaryData,
    errors::{BtydError, BtydResult},
    models::{
        beta_geo::BetaGeoParams, beta_geo_beta_binom::BetaGeoBetaBinomParams,
        modified_beta_geo::ModifiedBetaGeoParams, pareto_nbd::ParetoNbdParams,
    },
};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Beta, Distribution, Exp1, Gamma};

/// Gamma with shape `shape` and rate `rate`.
fn gamma_rate(name: &str, shape: f64, rate: f64) -> BtydResult<Gamma<f64>> {
    Gamma::new(shape, 1.0 / rate).map_err(|_| BtydError::InvalidParams {
        name: name.to_string(),
        value: rate,
        reason: "cannot parameterize a Gamma distribution",
    })
}

fn beta(name: &str, a: f64, b: f64) -> BtydResult<Beta<f64>> {
    Beta::new(a, b).map_err(|_| BtydError::InvalidParams {
        name: name.to_string(),
        value: a,
        reason: "cannot parameterize a Beta distribution",
    })
}

/// Next arrival after `t` for a Poisson process with rate `lambda`.
///
/// A zero rate (possible after Gamma underflow) never arrives.
fn next_arrival<R: Rng>(rng: &mut R, t: f64, lambda: f64) -> f64 {
    if lambda > 0.0 {
        t + rng.sample::<f64, _>(Exp1) / lambda
    } else {
        f64::INFINITY
    }
}

/// Repeat purchases of a beta-geometric customer alive at time zero.
fn beta_geometric_history<R: Rng>(rng: &mut R, lambda: f64, p: f64, age: f64) -> (f64, f64) {
    let (mut t, mut x, mut t_x) = (0.0, 0.0, 0.0);
    loop {
        t = next_arrival(rng, t, lambda);
        if t > age {
            return (x, t_x);
        }
        x += 1.0;
        t_x = t;
        if rng.gen_range(0.0..1.0) < p {
            return (x, t_x);
        }
    }
}

fn collect(histories: Vec<(f64, f64)>, ages: &Array1<f64>) -> BtydResult<SummaryData> {
    let (frequency, recency): (Vec<f64>, Vec<f64>) = histories.into_iter().unzip();
    SummaryData::new(Array1::from(frequency), Array1::from(recency), ages.clone(), None)
}

/// simulate_beta_geo — BG/NBD population with the given observation ages.
///
/// Parameters
/// ----------
/// - `params`: `&BetaGeoParams`
/// - `ages`: `&Array1<f64>`
///   Observation length `T` of each simulated customer.
/// - `seed`: `u64`
///
/// Errors
/// ------
/// - `BtydError::InvalidParams` if a mixing distribution cannot be built.
/// - Validation errors of [`SummaryData::new`] for invalid `ages`.
pub fn simulate_beta_geo(
    params: &BetaGeoParams, ages: &Array1<f64>, seed: u64,
) -> BtydResult<SummaryData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rates = gamma_rate("alpha", params.r, params.alpha)?;
    let dropout = beta("a", params.a, params.b)?;
    let histories = ages
        .iter()
        .map(|&age| {
            let lambda = rates.sample(&mut rng);
            let p = dropout.sample(&mut rng);
            beta_geometric_history(&mut rng, lambda, p, age)
        })
        .collect();
    collect(histories, ages)
}

/// MBG/NBD population; customers may drop out before any repeat purchase.
///
/// # Errors
/// - As [`simulate_beta_geo`].
pub fn simulate_modified_beta_geo(
    params: &ModifiedBetaGeoParams, ages: &Array1<f64>, seed: u64,
) -> BtydResult<SummaryData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rates = gamma_rate("alpha", params.r, params.alpha)?;
    let dropout = beta("a", params.a, params.b)?;
    let histories = ages
        .iter()
        .map(|&age| {
            let lambda = rates.sample(&mut rng);
            let p = dropout.sample(&mut rng);
            if rng.gen_range(0.0..1.0) < p {
                (0.0, 0.0)
            } else {
                beta_geometric_history(&mut rng, lambda, p, age)
            }
        })
        .collect();
    collect(histories, ages)
}

/// Pareto/NBD population with the given observation ages.
///
/// # Errors
/// - As [`simulate_beta_geo`].
pub fn simulate_pareto_nbd(
    params: &ParetoNbdParams, ages: &Array1<f64>, seed: u64,
) -> BtydResult<SummaryData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rates = gamma_rate("alpha", params.r, params.alpha)?;
    let hazards = gamma_rate("beta", params.s, params.beta)?;
    let histories = ages
        .iter()
        .map(|&age| {
            let lambda = rates.sample(&mut rng);
            let mu = hazards.sample(&mut rng);
            let end = next_arrival(&mut rng, 0.0, mu).min(age);
            let (mut t, mut x, mut t_x) = (0.0, 0.0, 0.0);
            loop {
                t = next_arrival(&mut rng, t, lambda);
                if t > end {
                    break (x, t_x);
                }
                x += 1.0;
                t_x = t;
            }
        })
        .collect();
    collect(histories, ages)
}

/// simulate_beta_geo_beta_binom — discrete-time BG/BB population.
///
/// Parameters
/// ----------
/// - `params`: `&BetaGeoBetaBinomParams`
/// - `n_periods`: `u32`
///   Transaction opportunities after the initial purchase.
/// - `n_customers`: `usize`
/// - `seed`: `u64`
///
/// Returns
/// -------
/// `BtydResult<SummaryData>`
///   Frequency, recency (last period with a transaction, `0` if none) and
///   `periods = n_periods` for every customer.
///
/// Errors
/// ------
/// - `BtydError::InvalidParams` if a mixing distribution cannot be built.
/// - `BtydError::EmptyData` for `n_customers = 0`.
pub fn simulate_beta_geo_beta_binom(
    params: &BetaGeoBetaBinomParams, n_periods: u32, n_customers: usize, seed: u64,
) -> BtydResult<SummaryData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let transact = beta("alpha", params.alpha, params.beta)?;
    let dropout = beta("gamma", params.gamma, params.delta)?;
    let histories = (0..n_customers)
        .map(|_| {
            let p = transact.sample(&mut rng);
            let theta = dropout.sample(&mut rng);
            let (mut x, mut t_x) = (0.0, 0.0);
            for period in 1..=n_periods {
                if rng.gen_range(0.0..1.0) < theta {
                    break;
                }
                if rng.gen_range(0.0..1.0) < p {
                    x += 1.0;
                    t_x = f64::from(period);
                }
            }
            (x, t_x)
        })
        .collect();
    collect(histories, &Array1::from_elem(n_customers, f64::from(n_periods)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btyd::models::traits::PurchaseModel;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Reproducibility under a fixed seed.
    // - Sample mean frequency against the closed-form `E[X(t)]`.
    // - Structural constraints of the generated histories.
    // -------------------------------------------------------------------------

    fn mean(values: &Array1<f64>) -> f64 {
        values.sum() / values.len() as f64
    }

    #[test]
    // Purpose
    // -------
    // Equal seeds reproduce a population; different seeds do not.
    //
    // Given
    // -----
    // - BG/NBD (0.243, 4.414, 0.793, 2.426), 500 customers at T = 39.
    //
    // Expect
    // ------
    // - Identical data for seed 7 twice; different data for seed 8.
    fn seeds_reproduce_populations() {
        let params = BetaGeoParams::new(0.243, 4.414, 0.793, 2.426).expect("valid params");
        let ages = Array1::from_elem(500, 39.0);
        let first = simulate_beta_geo(&params, &ages, 7).expect("simulates");
        let again = simulate_beta_geo(&params, &ages, 7).expect("simulates");
        let other = simulate_beta_geo(&params, &ages, 8).expect("simulates");
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    // Purpose
    // -------
    // Continuous-time simulators match the closed-form mean purchase count.
    //
    // Given
    // -----
    // - 20 000 customers at T = 39 for BG/NBD and Pareto/NBD reference
    //   parameters; E[X(39)] ≈ 1.197 and ≈ 1.213 (sample sd ≈ 2.5).
    //
    // Expect
    // ------
    // - Sample means within 0.1 of `E[X(39)]`.
    fn continuous_time_means_match_expectation() {
        let ages = Array1::from_elem(20_000, 39.0);

        let bg = BetaGeoParams::new(0.243, 4.414, 0.793, 2.426).expect("valid params");
        let bg_data = simulate_beta_geo(&bg, &ages, 11).expect("simulates");
        let bg_gap = mean(&bg_data.frequency) - bg.expected_number_of_purchases_up_to_time(39.0);
        assert!(bg_gap.abs() < 0.1, "BG/NBD gap {bg_gap}");

        let pareto = ParetoNbdParams::new(0.5534, 10.5802, 0.6061, 11.6562).expect("valid");
        let pareto_data = simulate_pareto_nbd(&pareto, &ages, 12).expect("simulates");
        let pareto_gap =
            mean(&pareto_data.frequency) - pareto.expected_number_of_purchases_up_to_time(39.0);
        assert!(pareto_gap.abs() < 0.1, "Pareto/NBD gap {pareto_gap}");
    }

    #[test]
    // Purpose
    // -------
    // BG/BB histories respect the discrete structure and the model mean.
    //
    // Given
    // -----
    // - (1.204, 0.750, 0.657, 2.783), six periods, 20 000 customers;
    //   E[X(6)] ≈ 2.22.
    //
    // Expect
    // ------
    // - Whole-number frequency ≤ recency ≤ 6; mean within 0.1 of E[X(6)].
    fn discrete_histories_are_consistent() {
        let params = BetaGeoBetaBinomParams::new(1.204, 0.750, 0.657, 2.783).expect("valid");
        let data = simulate_beta_geo_beta_binom(&params, 6, 20_000, 3).expect("simulates");
        for (x, t_x, n) in data.rows() {
            assert_eq!(x.fract(), 0.0);
            assert!(x <= t_x && t_x <= n && n == 6.0);
        }
        let gap = mean(&data.frequency) - params.expected_number_of_purchases_up_to_time(6.0);
        assert!(gap.abs() < 0.1, "BG/BB gap {gap}");
    }

    #[test]
    // Purpose
    // -------
    // MBG/NBD customers can leave before buying again, so more customers
    // have zero repeat purchases than under BG/NBD with equal parameters.
    //
    // Given
    // -----
    // - (0.525, 6.183, 0.891, 1.614) for both models, 5 000 customers, T = 30.
    //
    // Expect
    // ------
    // - More zero-frequency customers under MBG/NBD.
    fn modified_model_has_more_zeros() {
        let ages = Array1::from_elem(5_000, 30.0);
        let bg = BetaGeoParams::new(0.525, 6.183, 0.891, 1.614).expect("valid");
        let mbg = ModifiedBetaGeoParams::new(0.525, 6.183, 0.891, 1.614).expect("valid");
        let zeros = |d: &SummaryData| d.frequency.iter().filter(|&&x| x == 0.0).count();
        let bg_zeros = zeros(&simulate_beta_geo(&bg, &ages, 5).expect("simulates"));
        let mbg_zeros = zeros(&simulate_modified_beta_geo(&mbg, &ages, 5).expect("simulates"));
        assert!(mbg_zeros > bg_zeros);
    }
}
