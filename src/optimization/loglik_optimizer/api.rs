//! High-level entry point for maximizing a user-provided `LogLikelihood`.
//!
//! The primary path runs L-BFGS with the configured line search through an
//! `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`). When that run fails and
//! `opts.nelder_mead_fallback` is set, the same problem is restarted with
//! Nelder–Mead through a `SimplexAdapter`, from the best point L-BFGS
//! evaluated before failing.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::{ArgMinAdapter, BestIterate, SimplexAdapter},
        builders::{build_nelder_mead, build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::{run_lbfgs, run_nelder_mead},
        traits::{LineSearcher, LogLikelihood, MLEOptions},
        validation::validate_theta0,
    },
};

/// Maximize a log-likelihood `ℓ(θ)`.
///
/// # Behavior
/// - Validates `θ₀` (non-empty, finite) and calls `f.check(θ₀, data)`.
/// - Runs L-BFGS with **More–Thuente** or **Hager–Zhang** line search as
///   selected by `opts.line_searcher`.
/// - If L-BFGS returns an error and `opts.nelder_mead_fallback` is `true`,
///   logs a warning and reruns with Nelder–Mead from the lowest-cost point
///   L-BFGS evaluated (`θ₀` if none was finite). The fallback error, if any,
///   is the one returned.
/// - Hitting `max_iter` is not an error: the outcome carries
///   `converged == false` and the best iterate.
///
/// # Parameters
/// - `f`: the objective implementing [`LogLikelihood`].
/// - `theta0`: initial parameter vector.
/// - `data`: payload passed through to `value`/`grad`.
/// - `opts`: optimizer options.
///
/// # Errors
/// - `OptError::EmptyTheta` / `OptError::InvalidThetaInput` for a bad `θ₀`.
/// - Any error from `f.check`.
/// - Builder errors and runtime errors of the last solver attempted.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_btyd::optimization::errors::OptResult;
/// use rust_btyd::optimization::loglik_optimizer::{maximize, LogLikelihood, MLEOptions, Theta};
///
/// struct Concave;
/// impl LogLikelihood for Concave {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Concave, array![0.1, -0.2, 0.3], &(), &MLEOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), rust_btyd::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    validate_theta0(&theta0)?;
    f.check(&theta0, data)?;
    let best = BestIterate::new();
    match maximize_lbfgs(f, theta0.clone(), data, opts, &best) {
        Ok(outcome) => Ok(outcome),
        Err(err) if opts.nelder_mead_fallback => {
            let start = fallback_start(&best, theta0);
            log::warn!("L-BFGS failed ({err}); retrying with Nelder-Mead from its best iterate");
            let solver = build_nelder_mead(&start, opts)?;
            run_nelder_mead(opts, SimplexAdapter::new(f, data), solver)
        }
        Err(err) => Err(err),
    }
}

// ---- Helper methods ----

fn maximize_lbfgs<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions, best: &BestIterate,
) -> OptResult<OptimOutcome> {
    let problem = ArgMinAdapter::tracked(f, data, best);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

fn fallback_start(best: &BestIterate, theta0: Theta) -> Theta {
    best.theta().unwrap_or(theta0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::traits::Tolerances,
    };
    use ndarray::array;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - End-to-end maximization of smooth concave objectives with both line
    //   searches.
    // - The Nelder–Mead fallback when L-BFGS cannot evaluate its first step.
    // - The fallback start when L-BFGS fails after making progress.
    // - Rejection of invalid starting points.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -(θ₀ - 1)² - 2(θ₁ + 0.5)², maximized at (1, -0.5).
    struct Paraboloid;

    impl LogLikelihood for Paraboloid {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * (theta[1] + 0.5).powi(2))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    /// Paraboloid whose analytic gradient always fails with a non-recoverable
    /// error, forcing the L-BFGS path to abort.
    struct BrokenGradient;

    impl LogLikelihood for BrokenGradient {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Paraboloid.value(theta, &())
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, _: &Theta, _: &()) -> OptResult<ndarray::Array1<f64>> {
            Err(OptError::UnknownError)
        }
    }

    /// ℓ(θ) = -¼‖θ - (1, -0.5)‖² whose analytic gradient fails from the
    /// third call on, after L-BFGS has completed one line search.
    struct FlakyGradient {
        calls: Cell<usize>,
    }

    impl LogLikelihood for FlakyGradient {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-0.25 * ((theta[0] - 1.0).powi(2) + (theta[1] + 0.5).powi(2)))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, theta: &Theta, _: &()) -> OptResult<ndarray::Array1<f64>> {
            let calls = self.calls.get() + 1;
            self.calls.set(calls);
            if calls > 2 {
                return Err(OptError::UnknownError);
            }
            Ok(array![-0.5 * (theta[0] - 1.0), -0.5 * (theta[1] + 0.5)])
        }
    }

    #[test]
    // Purpose
    // -------
    // L-BFGS finds the maximizer of a smooth concave objective with either
    // line search.
    //
    // Given
    // -----
    // - `Paraboloid` from θ₀ = (0, 0).
    //
    // Expect
    // ------
    // - θ̂ ≈ (1, -0.5), ℓ(θ̂) ≈ 0, `solver == "L-BFGS"`.
    fn maximize_recovers_paraboloid_peak_with_both_line_searches() {
        for line_searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            // Arrange
            let tols = Tolerances::new(Some(1e-8), Some(1e-14), Some(200)).expect("valid tols");
            let opts = MLEOptions::new(tols, line_searcher, None).expect("valid options");

            // Act
            let out = maximize(&Paraboloid, array![0.0, 0.0], &(), &opts).expect("converges");

            // Assert
            assert_eq!(out.solver, "L-BFGS");
            assert!((out.theta_hat[0] - 1.0).abs() < 1e-4);
            assert!((out.theta_hat[1] + 0.5).abs() < 1e-4);
            assert!(out.value.abs() < 1e-7);
        }
    }

    #[test]
    // Purpose
    // -------
    // A failing L-BFGS run is rescued by Nelder–Mead when the fallback is on,
    // and surfaces the error when it is off.
    //
    // Given
    // -----
    // - `BrokenGradient` from θ₀ = (0, 0).
    //
    // Expect
    // ------
    // - Fallback on: `solver == "Nelder-Mead"` and θ̂ near (1, -0.5).
    // - Fallback off: `Err(OptError::UnknownError)`.
    fn maximize_falls_back_to_nelder_mead_on_lbfgs_failure() {
        // Arrange
        let tols = Tolerances::new(None, Some(1e-12), Some(2000)).expect("valid tols");
        let with_fallback =
            MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid options");
        let without_fallback = with_fallback.clone().with_fallback(false, 0.25).expect("valid");

        // Act
        let rescued = maximize(&BrokenGradient, array![0.0, 0.0], &(), &with_fallback)
            .expect("Nelder-Mead should succeed");
        let failed = maximize(&BrokenGradient, array![0.0, 0.0], &(), &without_fallback);

        // Assert
        assert_eq!(rescued.solver, "Nelder-Mead");
        assert!((rescued.theta_hat[0] - 1.0).abs() < 1e-3);
        assert!((rescued.theta_hat[1] + 0.5).abs() < 1e-3);
        assert_eq!(failed, Err(OptError::UnknownError));
    }

    #[test]
    // Purpose
    // -------
    // Invalid starting points are rejected before any solver runs.
    //
    // Given
    // -----
    // - An empty θ₀ and a θ₀ containing NaN.
    //
    // Expect
    // ------
    // - `EmptyTheta` and `InvalidThetaInput`.
    fn maximize_rejects_invalid_theta0() {
        let opts = MLEOptions::default();
        assert_eq!(
            maximize(&Paraboloid, Theta::zeros(0), &(), &opts),
            Err(OptError::EmptyTheta)
        );
        assert!(matches!(
            maximize(&Paraboloid, array![f64::NAN, 0.0], &(), &opts),
            Err(OptError::InvalidThetaInput { index: 0, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Progress made by L-BFGS before a failure is kept: the tracker ends
    // below the starting cost and the fallback starts there.
    //
    // Given
    // -----
    // - `FlakyGradient` from θ₀ = (0, 0), where the cost is 0.3125.
    // - An empty tracker.
    //
    // Expect
    // ------
    // - The tracked cost is below 0.3125 and `fallback_start` returns the
    //   tracked point; with nothing tracked it returns θ₀.
    // - `maximize` with the fallback still reaches (1, -0.5).
    fn fallback_starts_from_best_lbfgs_iterate() {
        // Arrange
        let tols = Tolerances::new(None, Some(1e-12), Some(2000)).expect("valid tols");
        let opts = MLEOptions::new(tols, LineSearcher::MoreThuente, None).expect("valid options");
        let flaky = FlakyGradient { calls: Cell::new(0) };
        let best = BestIterate::new();
        let theta0 = array![0.0, 0.0];

        // Act
        let _ = maximize_lbfgs(&flaky, theta0.clone(), &(), &opts, &best);
        let start = fallback_start(&best, theta0.clone());
        let untouched = fallback_start(&BestIterate::new(), theta0.clone());
        let rescued = maximize(&FlakyGradient { calls: Cell::new(0) }, theta0.clone(), &(), &opts)
            .expect("fallback succeeds");

        // Assert
        let best_cost = best.cost().expect("finite cost recorded");
        assert!(best_cost < 0.3125, "best cost {best_cost}");
        assert_eq!(Some(start), best.theta());
        assert_eq!(untouched, theta0);
        assert!((rescued.theta_hat[0] - 1.0).abs() < 1e-3);
        assert!((rescued.theta_hat[1] + 0.5).abs() < 1e-3);
    }
}
