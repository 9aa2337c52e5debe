//! Nonlinear least squares.
//!
//! Levenberg-Marquardt with a forward-difference Jacobian, plus an
//! augmented Lagrangian wrapper for equality constraints. Failing to
//! converge is not an error: it is reported in [`LeastSquaresReport`].

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use rayon::prelude::*;

/// Relative step of the forward-difference Jacobian, sqrt of the machine
/// epsilon.
const JACOBIAN_STEP: f64 = 1.4901161193847656e-8;

/// Damping beyond which a step is considered impossible.
const MAX_DAMPING: f64 = 1e16;

/// Tuning of the Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Maximum number of residual evaluations, `200 (n + 1)` for `n`
    /// parameters when `None`.
    pub max_evaluations: Option<usize>,
    /// Relative reduction of the cost below which the fit has converged.
    pub ftol: f64,
    /// Relative step size below which the fit has converged.
    pub xtol: f64,
    /// Largest gradient component below which the fit has converged.
    pub gtol: f64,
    /// Initial Marquardt damping.
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_evaluations: None,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            initial_damping: 1e-3,
        }
    }
}

/// Tuning of the augmented Lagrangian outer loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstrainedOptions {
    /// Options of each inner least-squares solve.
    pub solver: SolverOptions,
    /// Initial penalty weight.
    pub initial_penalty: f64,
    /// Factor applied to the penalty when the violation does not shrink.
    pub penalty_growth: f64,
    /// Largest absolute constraint residual accepted.
    pub tolerance: f64,
    /// Maximum number of outer iterations.
    pub max_outer_iterations: usize,
}

impl Default for ConstrainedOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
            initial_penalty: 1.0,
            penalty_growth: 10.0,
            tolerance: 1e-8,
            max_outer_iterations: 20,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The relative reduction of the cost fell below `ftol`
    CostConverged,
    /// The relative step fell below `xtol`
    StepConverged,
    /// The gradient fell below `gtol`, or the cost reached zero
    GradientConverged,
    /// The evaluation budget was exhausted
    MaxEvaluations,
    /// The residuals at the starting point are not finite
    NonFiniteResiduals,
    /// The equality constraints are still violated after the last outer
    /// iteration
    ConstraintViolated,
}

/// Outcome of a least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresReport {
    /// Best parameters found.
    pub params: Array1<f64>,
    /// Sum of squared residuals at `params`, constraints excluded.
    pub cost: f64,
    /// Largest absolute equality constraint residual, 0 without constraints.
    pub constraint_violation: f64,
    /// Number of accepted steps.
    pub iterations: usize,
    /// Number of residual evaluations.
    pub evaluations: usize,
    /// Why the solver stopped.
    pub termination: Termination,
}

impl LeastSquaresReport {
    /// Whether the fit stopped on a convergence criterion.
    pub fn converged(&self) -> bool {
        matches!(
            self.termination,
            Termination::CostConverged | Termination::StepConverged | Termination::GradientConverged
        )
    }
}

/// Minimize the sum of squares of `residuals` starting from `initial`.
pub fn least_squares<F>(residuals: F, initial: Array1<f64>, options: &SolverOptions) -> LeastSquaresReport
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    let n = initial.len();
    let max_evaluations = options.max_evaluations.unwrap_or(200 * (n + 1));

    let mut params = initial;
    let mut r = residuals(&params);
    let mut cost = r.dot(&r);
    let mut evaluations = 1;
    let mut iterations = 0;

    let report = |params, cost, iterations, evaluations, termination| LeastSquaresReport {
        params,
        cost,
        constraint_violation: 0.0,
        iterations,
        evaluations,
        termination,
    };

    if !cost.is_finite() {
        return report(params, cost, 0, evaluations, Termination::NonFiniteResiduals);
    }

    let mut damping = options.initial_damping;

    loop {
        if cost == 0.0 {
            return report(params, cost, iterations, evaluations, Termination::GradientConverged);
        }

        let jacobian = forward_jacobian(&residuals, &params, &r);
        evaluations += n;

        let jt = jacobian.transpose();
        let jtj = &jt * &jacobian;
        let gradient = &jt * DVector::from_iterator(r.len(), r.iter().copied());

        if gradient.amax() <= options.gtol {
            return report(params, cost, iterations, evaluations, Termination::GradientConverged);
        }

        // Inner loop: raise the damping until a step lowers the cost
        loop {
            if evaluations >= max_evaluations {
                debug!("least squares stopped after {evaluations} evaluations");
                return report(params, cost, iterations, evaluations, Termination::MaxEvaluations);
            }

            let mut system = jtj.clone();
            for i in 0..n {
                system[(i, i)] += damping * jtj[(i, i)].max(f64::EPSILON);
            }
            let Some(step) = solve(system, -&gradient) else {
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    return report(params, cost, iterations, evaluations, Termination::StepConverged);
                }
                continue;
            };

            let step = Array1::from_iter(step.iter().copied());
            let candidate = &params + &step;
            let r_candidate = residuals(&candidate);
            evaluations += 1;
            let cost_candidate = r_candidate.dot(&r_candidate);

            let step_norm = step.dot(&step).sqrt();
            let params_norm = params.dot(&params).sqrt();
            let small_step = step_norm <= options.xtol * (params_norm + options.xtol);

            if cost_candidate.is_finite() && cost_candidate < cost {
                let reduction = (cost - cost_candidate) / cost;
                params = candidate;
                r = r_candidate;
                cost = cost_candidate;
                iterations += 1;
                damping = (damping / 10.0).max(f64::EPSILON);
                trace!("iteration {iterations}: cost {cost:e}, damping {damping:e}");

                if reduction <= options.ftol {
                    return report(params, cost, iterations, evaluations, Termination::CostConverged);
                }
                if small_step {
                    return report(params, cost, iterations, evaluations, Termination::StepConverged);
                }
                break;
            }

            if small_step || damping > MAX_DAMPING {
                return report(params, cost, iterations, evaluations, Termination::StepConverged);
            }
            damping *= 10.0;
        }
    }
}

/// Minimize the sum of squares of `residuals` subject to
/// `constraints(params) = 0`.
///
/// Each outer iteration solves an unconstrained problem where the
/// constraints are appended as penalty residuals `sqrt(μ) (c + λ / 2μ)`,
/// then updates the multipliers `λ ← λ + 2μc`.
pub fn constrained_least_squares<F, G>(
    residuals: F,
    constraints: G,
    initial: Array1<f64>,
    options: &ConstrainedOptions,
) -> LeastSquaresReport
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
    G: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    let num_constraints = constraints(&initial).len();
    let mut multipliers = Array1::<f64>::zeros(num_constraints);
    let mut penalty = options.initial_penalty;
    let mut params = initial;
    let mut violation = f64::INFINITY;
    let mut iterations = 0;
    let mut evaluations = 0;
    let mut termination = Termination::ConstraintViolated;

    for outer in 0..options.max_outer_iterations {
        let augmented = |p: &Array1<f64>| -> Array1<f64> {
            let r = residuals(p);
            let c = constraints(p);
            let scale = penalty.sqrt();
            r.iter()
                .copied()
                .chain(
                    c.iter()
                        .zip(&multipliers)
                        .map(|(c, l)| scale * (c + l / (2.0 * penalty))),
                )
                .collect()
        };

        let inner = least_squares(augmented, params, &options.solver);
        params = inner.params;
        iterations += inner.iterations;
        evaluations += inner.evaluations;
        termination = inner.termination;

        let c = constraints(&params);
        let new_violation = c.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
        debug!("outer iteration {outer}: violation {new_violation:e}, penalty {penalty:e}");

        if new_violation <= options.tolerance {
            violation = new_violation;
            break;
        }

        multipliers.scaled_add(2.0 * penalty, &c);
        if new_violation > 0.25 * violation {
            penalty *= options.penalty_growth;
        }
        violation = new_violation;
        termination = Termination::ConstraintViolated;
    }

    let r = residuals(&params);
    LeastSquaresReport {
        cost: r.dot(&r),
        params,
        constraint_violation: violation,
        iterations,
        evaluations: evaluations + 1,
        termination,
    }
}

/// Forward-difference Jacobian, one column per parameter, computed in
/// parallel.
fn forward_jacobian<F>(residuals: &F, params: &Array1<f64>, r: &Array1<f64>) -> DMatrix<f64>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    let columns: Vec<Array1<f64>> = (0..params.len())
        .into_par_iter()
        .map(|j| {
            let h = JACOBIAN_STEP * params[j].abs().max(1.0);
            let mut shifted = params.clone();
            shifted[j] += h;
            (residuals(&shifted) - r) / h
        })
        .collect();

    DMatrix::from_fn(r.len(), params.len(), |i, j| columns[j][i])
}

/// Solve the symmetric damped normal equations, Cholesky first and LU if
/// the matrix is not numerically positive definite.
fn solve(system: DMatrix<f64>, rhs: DVector<f64>) -> Option<DVector<f64>> {
    let solution = match system.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => system.lu().solve(&rhs)?,
    };
    solution.iter().all(|x| x.is_finite()).then_some(solution)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    use super::*;

    #[test]
    fn fits_an_exponential_decay() {
        let t = Array1::<f64>::linspace(0., 4., 30);
        let observed = t.mapv(|t| 2.5 * (-1.3 * t).exp() + 0.4);
        let report = least_squares(
            |p| t.mapv(|t| p[0] * (-p[1] * t).exp() + p[2]) - &observed,
            array![1.0, 0.5, 0.0],
            &SolverOptions::default(),
        );
        assert!(report.converged(), "{:?}", report.termination);
        assert_abs_diff_eq!(report.params[0], 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 1.3, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[2], 0.4, epsilon = 1e-6);
        assert!(report.cost < 1e-12);
    }

    #[test]
    fn reports_non_finite_start() {
        let report = least_squares(
            |p| p.mapv(|x| x.sqrt()),
            array![-1.0],
            &SolverOptions::default(),
        );
        assert_eq!(report.termination, Termination::NonFiniteResiduals);
        assert!(!report.converged());
    }

    #[test]
    fn reports_exhausted_budget() {
        let options = SolverOptions {
            max_evaluations: Some(3),
            ..Default::default()
        };
        let report = least_squares(
            |p| array![10.0 * (p[1] - p[0].powi(2)), 1.0 - p[0]],
            array![-1.2, 1.0],
            &options,
        );
        assert_eq!(report.termination, Termination::MaxEvaluations);
    }

    #[test]
    fn equality_constraint_is_satisfied() {
        // Closest point to (1, 2, 3) on the plane x + y + z = 3
        let target = array![1.0, 2.0, 3.0];
        let report = constrained_least_squares(
            |p| p - &target,
            |p| array![p.sum() - 3.0],
            array![0.0, 0.0, 0.0],
            &ConstrainedOptions::default(),
        );
        assert!(report.constraint_violation <= 1e-8);
        assert_abs_diff_eq!(report.params[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[2], 2.0, epsilon = 1e-6);
    }
}
