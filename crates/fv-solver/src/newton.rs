//! Newton solver with backtracking line search.

use fv_core::{Real, Tolerances, within_tolerance};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};
use crate::jacobian::finite_difference_jacobian;

/// Newton solver configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: Real,
    /// Relative tolerance for residual norm (against the initial residual)
    pub rel_tol: Real,
    /// Line search backtracking factor
    pub line_search_beta: Real,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Relative perturbation for finite difference Jacobians
    pub fd_epsilon: Real,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
            fd_epsilon: 1e-7,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<Real>,
    /// Final residual norm
    pub residual_norm: Real,
    /// Number of iterations
    pub iterations: usize,
}

/// Why a residual evaluation produced no value.
#[derive(Clone, Debug, PartialEq)]
pub enum ResidualFailure {
    /// The trial point is unusable; take a shorter step.
    Retry { what: String },
    /// Abort the solve.
    Fatal { what: String },
}

/// A square nonlinear system `F(x) = 0`.
pub trait NonlinearProblem {
    fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure>;

    /// Jacobian at `x`; `f_x` is the residual already computed there.
    fn jacobian(
        &mut self,
        x: &DVector<Real>,
        f_x: &DVector<Real>,
        epsilon: Real,
    ) -> SolverResult<DMatrix<Real>> {
        finite_difference_jacobian(self, x, f_x, epsilon)
    }
}

fn converged(r_norm: Real, r0_norm: Real, config: &NewtonConfig) -> bool {
    let tol = Tolerances {
        abs: config.abs_tol,
        rel: config.rel_tol,
    };
    within_tolerance(r_norm, r0_norm, tol)
}

/// Damped Newton iteration.
///
/// A trial step is accepted once its residual is finite and smaller than the
/// current one; a `Retry` failure or a non-decreasing residual halves the
/// step (by `line_search_beta`), a `Fatal` failure aborts immediately.
pub fn newton_solve<P>(
    problem: &mut P,
    x0: DVector<Real>,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    P: NonlinearProblem + ?Sized,
{
    let mut x = x0;
    let mut r = match problem.residual(&x) {
        Ok(r) => r,
        Err(ResidualFailure::Retry { what }) => {
            return Err(SolverError::ConvergenceFailed {
                what: format!("initial guess rejected: {what}"),
            });
        }
        Err(ResidualFailure::Fatal { what }) => return Err(SolverError::Fatal { what }),
    };
    if r.len() != x.len() {
        return Err(SolverError::InvalidSystem {
            what: format!("residual has {} entries for {} unknowns", r.len(), x.len()),
        });
    }
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        debug!(iter, residual = r_norm, "newton");
        if converged(r_norm, r0_norm, config) {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
            });
        }
        if !r_norm.is_finite() {
            return Err(SolverError::NonFinite {
                what: format!("Newton residual at iteration {iter}"),
            });
        }

        let jac = problem.jacobian(&x, &r, config.fd_epsilon)?;

        // Solve J * dx = -r
        let dx = jac.lu().solve(&(-&r)).ok_or_else(|| SolverError::Singular {
            what: format!("Newton Jacobian at iteration {iter}"),
        })?;

        let mut alpha = 1.0;
        let mut accepted = None;
        let mut fallback = None;
        for _ in 0..=config.max_line_search_iters {
            let x_new = &x + alpha * &dx;
            match problem.residual(&x_new) {
                Ok(r_new) => {
                    let n = r_new.norm();
                    if n < r_norm {
                        accepted = Some((x_new, r_new, n));
                        break;
                    }
                    if n.is_finite() {
                        fallback = Some((x_new, r_new, n));
                    }
                }
                Err(ResidualFailure::Retry { what }) => {
                    debug!(iter, alpha, %what, "newton step rejected");
                }
                Err(ResidualFailure::Fatal { what }) => return Err(SolverError::Fatal { what }),
            }
            alpha *= config.line_search_beta;
        }

        // Without a decrease the shortest finite step is still taken.
        let Some((x_new, r_new, n)) = accepted.or(fallback) else {
            warn!(iter, "newton line search found no admissible step");
            return Err(SolverError::ConvergenceFailed {
                what: format!("Line search stagnated at iteration {iter}"),
            });
        };
        x = x_new;
        r = r_new;
        r_norm = n;
    }

    if converged(r_norm, r0_norm, config) {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
        });
    }
    warn!(residual = r_norm, "newton iteration cap reached");
    Err(SolverError::ConvergenceFailed {
        what: format!(
            "Maximum iterations {} reached, residual = {}",
            config.max_iterations, r_norm
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic {
        evaluations: usize,
    }

    impl NonlinearProblem for Quadratic {
        fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
            self.evaluations += 1;
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        }

        fn jacobian(
            &mut self,
            x: &DVector<Real>,
            _f_x: &DVector<Real>,
            _epsilon: Real,
        ) -> SolverResult<DMatrix<Real>> {
            Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
        }
    }

    #[test]
    fn simple_quadratic() {
        let mut p = Quadratic { evaluations: 0 };
        let result =
            newton_solve(&mut p, DVector::from_element(1, 3.0), &NewtonConfig::default()).unwrap();
        assert!((result.x[0] - 2.0).abs() < 1e-10);
        assert!(result.iterations < 10);
        assert!(p.evaluations > result.iterations);
    }

    /// sqrt(x) = 1 is undefined for x < 0; the first full step overshoots.
    struct Root;

    impl NonlinearProblem for Root {
        fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
            if x[0] < 0.0 {
                return Err(ResidualFailure::Retry {
                    what: "negative argument".into(),
                });
            }
            Ok(DVector::from_element(1, x[0].sqrt() - 1.0))
        }
    }

    #[test]
    fn retry_failures_backtrack() {
        let result =
            newton_solve(&mut Root, DVector::from_element(1, 9.0), &NewtonConfig::default())
                .unwrap();
        assert!((result.x[0] - 1.0).abs() < 1e-8);
    }

    struct Exploding;

    impl NonlinearProblem for Exploding {
        fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
            if x[0] != 5.0 {
                return Err(ResidualFailure::Fatal {
                    what: "solver state corrupted".into(),
                });
            }
            Ok(DVector::from_element(1, 1.0))
        }
    }

    #[test]
    fn fatal_failure_aborts() {
        let err = newton_solve(
            &mut Exploding,
            DVector::from_element(1, 5.0),
            &NewtonConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::Fatal { .. }));
    }

    struct NanResidual;

    impl NonlinearProblem for NanResidual {
        fn residual(&mut self, _x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
            Ok(DVector::from_element(1, Real::NAN))
        }
    }

    #[test]
    fn nan_never_converges() {
        let err = newton_solve(
            &mut NanResidual,
            DVector::from_element(1, 0.0),
            &NewtonConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::NonFinite { .. }));
    }
}
