//! Adapters that expose a [`LogLikelihood`] as argmin problems.
//!
//! Maximizing `ℓ(θ)` becomes minimizing `c(θ) = -ℓ(θ)`.
//!
//! - [`ArgMinAdapter`] serves gradient-based solvers. A non-finite cost is an
//!   error there, so a line search never interpolates through `NaN`/`∞`.
//! - [`SimplexAdapter`] serves Nelder–Mead. A non-finite cost becomes `+∞`,
//!   which the simplex simply ranks last.
//! - [`BestIterate`] remembers the lowest finite cost an `ArgMinAdapter` has
//!   evaluated, so a failed gradient run still leaves a usable point.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Lowest finite cost evaluated so far and the parameters that produced it.
#[derive(Debug, Default)]
pub struct BestIterate {
    slot: RefCell<Option<(Cost, Theta)>>,
}

impl BestIterate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `(cost, θ)` if it improves on the stored point.
    pub fn record(&self, theta: &Theta, cost: Cost) {
        let mut slot = self.slot.borrow_mut();
        let improves = match slot.as_ref() {
            Some((best, _)) => cost < *best,
            None => true,
        };
        if improves && cost.is_finite() {
            *slot = Some((cost, theta.clone()));
        }
    }

    /// Stored cost, if any finite cost was recorded.
    pub fn cost(&self) -> Option<Cost> {
        self.slot.borrow().as_ref().map(|(cost, _)| *cost)
    }

    /// Stored parameters, if any finite cost was recorded.
    pub fn theta(&self) -> Option<Theta> {
        self.slot.borrow().as_ref().map(|(_, theta)| theta.clone())
    }
}

/// Bridges a [`LogLikelihood`] to argmin's `CostFunction` and `Gradient`.
///
/// - `cost` returns `-ℓ(θ)` and fails with `NonFiniteCost` off the feasible set.
/// - `gradient` returns `-∇ℓ(θ)` when an analytic gradient exists, otherwise a
///   finite-difference gradient of the cost (central first, forward on failure).
/// - With a tracker attached, every finite cost is offered to it.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
    pub best: Option<&'a BestIterate>,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data, best: None }
    }

    /// Adapter that reports its evaluations to `best`.
    pub fn tracked(f: &'a F, data: &'a F::Data, best: &'a BestIterate) -> Self {
        Self { f, data, best: Some(best) }
    }
}

impl<F: LogLikelihood> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        if let Some(best) = self.best {
            best.record(theta, -output);
        }
        Ok(-output)
    }
}

impl<F: LogLikelihood> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// The finite-difference closure must return `f64`, so the first error
    /// raised by `cost` is parked in `closure_err` and the closure yields
    /// `NaN`. A captured error or an invalid central gradient triggers one
    /// forward-difference retry, whose failure is returned.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Derivative-free view of a [`LogLikelihood`] for simplex methods.
#[derive(Debug, Clone)]
pub struct SimplexAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> SimplexAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: LogLikelihood> CostFunction for SimplexAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if output.is_finite() { Ok(-output) } else { Ok(f64::INFINITY) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Sign conventions of both adapters.
    // - Finite-difference gradients when no analytic gradient exists.
    // - Treatment of non-finite objective values.
    // - Best-iterate tracking.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -(θ₀ - 1)² - 2 θ₁², and -∞ when θ₀ > 10.
    struct Bowl;

    impl LogLikelihood for Bowl {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            if theta[0] > 10.0 {
                return Ok(f64::NEG_INFINITY);
            }
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * theta[1].powi(2))
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // The cost is the negated objective and the FD gradient matches the
    // analytic cost gradient.
    //
    // Given
    // -----
    // - `Bowl` at θ = (0, 1).
    //
    // Expect
    // ------
    // - cost = 3, ∇c ≈ (-2, 4).
    fn cost_and_fd_gradient_follow_sign_convention() {
        // Arrange
        let problem = ArgMinAdapter::new(&Bowl, &());
        let theta = array![0.0, 1.0];

        // Act
        let cost = problem.cost(&theta).expect("finite cost");
        let grad = problem.gradient(&theta).expect("finite gradient");

        // Assert
        assert!((cost - 3.0).abs() < 1e-12);
        assert!((grad[0] + 2.0).abs() < 1e-5);
        assert!((grad[1] - 4.0).abs() < 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Infeasible points are an error for gradient solvers and +∞ for the
    // simplex adapter.
    //
    // Given
    // -----
    // - `Bowl` at θ = (11, 0) where ℓ = -∞.
    //
    // Expect
    // ------
    // - `ArgMinAdapter::cost` fails; `SimplexAdapter::cost` returns +∞.
    fn non_finite_values_are_routed_per_solver() {
        // Arrange
        let theta = array![11.0, 0.0];

        // Act
        let strict = ArgMinAdapter::new(&Bowl, &()).cost(&theta);
        let lenient = SimplexAdapter::new(&Bowl, &()).cost(&theta).expect("infinite cost");

        // Assert
        assert!(strict.is_err());
        assert_eq!(lenient, f64::INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // A tracked adapter keeps the lowest finite cost it evaluated.
    //
    // Given
    // -----
    // - `Bowl` evaluated at (0, 1), (1, 0), (0.5, 0.5) and the infeasible
    //   (11, 0).
    //
    // Expect
    // ------
    // - The tracker holds θ = (1, 0) with cost 0; the failed evaluation
    //   leaves it unchanged.
    fn tracker_keeps_lowest_finite_cost() {
        // Arrange
        let best = BestIterate::new();
        let problem = ArgMinAdapter::tracked(&Bowl, &(), &best);

        // Act
        for theta in [array![0.0, 1.0], array![1.0, 0.0], array![0.5, 0.5]] {
            problem.cost(&theta).expect("finite cost");
        }
        let infeasible = problem.cost(&array![11.0, 0.0]);

        // Assert
        assert!(infeasible.is_err());
        assert_eq!(best.cost(), Some(0.0));
        assert_eq!(best.theta(), Some(array![1.0, 0.0]));
    }
}
