//! Finite difference Jacobian computation.

use fv_core::Real;
use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::newton::{NonlinearProblem, ResidualFailure};

/// Forward-difference Jacobian of `problem` at `x`, given `f_x = F(x)`.
///
/// Column `j` perturbs `x[j]` by `epsilon * max(|x[j]|, 1)`. If the residual
/// refuses the forward point the backward point is tried instead.
pub fn finite_difference_jacobian<P>(
    problem: &mut P,
    x: &DVector<Real>,
    f_x: &DVector<Real>,
    epsilon: Real,
) -> SolverResult<DMatrix<Real>>
where
    P: NonlinearProblem + ?Sized,
{
    let n = x.len();
    let m = f_x.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();

    for j in 0..n {
        let h = epsilon * x[j].abs().max(1.0);
        let mut column = None;
        for step in [h, -h] {
            x_perturbed[j] = x[j] + step;
            match problem.residual(&x_perturbed) {
                Ok(f_perturbed) => {
                    column = Some((f_perturbed - f_x) / step);
                    break;
                }
                Err(ResidualFailure::Retry { .. }) => continue,
                Err(ResidualFailure::Fatal { what }) => return Err(SolverError::Fatal { what }),
            }
        }
        x_perturbed[j] = x[j];

        let Some(df) = column else {
            return Err(SolverError::ConvergenceFailed {
                what: format!("residual rejected both perturbations of unknown {j}"),
            });
        };
        jac.set_column(j, &df);
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Map<F>(F);

    impl<F> NonlinearProblem for Map<F>
    where
        F: FnMut(&DVector<Real>) -> Result<DVector<Real>, ResidualFailure>,
    {
        fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
            (self.0)(x)
        }
    }

    #[test]
    fn jacobian_linear() {
        // f(x) = 2*x, J = 2
        let mut p = Map(|x: &DVector<Real>| Ok(x * 2.0));
        let x = DVector::from_element(1, 3.0);
        let f_x = p.residual(&x).unwrap();
        let jac = finite_difference_jacobian(&mut p, &x, &f_x, 1e-7).unwrap();
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn jacobian_coupled() {
        // f = (x0 * x1, x0 + x1^2)
        let mut p = Map(|x: &DVector<Real>| {
            Ok(DVector::from_vec(vec![x[0] * x[1], x[0] + x[1] * x[1]]))
        });
        let x = DVector::from_vec(vec![2.0, 3.0]);
        let f_x = p.residual(&x).unwrap();
        let jac = finite_difference_jacobian(&mut p, &x, &f_x, 1e-7).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 1.0, 6.0]);
        assert!((jac - expected).amax() < 1e-5);
    }

    #[test]
    fn backward_step_when_forward_is_refused() {
        // defined only for x <= 1
        let mut p = Map(|x: &DVector<Real>| {
            if x[0] > 1.0 {
                Err(ResidualFailure::Retry {
                    what: "outside domain".into(),
                })
            } else {
                Ok(x.map(|v| v * v))
            }
        });
        let x = DVector::from_element(1, 1.0);
        let f_x = p.residual(&x).unwrap();
        let jac = finite_difference_jacobian(&mut p, &x, &f_x, 1e-7).unwrap();
        assert!((jac[(0, 0)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn fatal_aborts() {
        let mut calls = 0;
        let mut p = Map(|x: &DVector<Real>| {
            calls += 1;
            if calls > 1 {
                Err(ResidualFailure::Fatal {
                    what: "boom".into(),
                })
            } else {
                Ok(x.clone())
            }
        });
        let x = DVector::from_element(1, 0.0);
        let f_x = p.residual(&x).unwrap();
        let err = finite_difference_jacobian(&mut p, &x, &f_x, 1e-7).unwrap_err();
        assert!(matches!(err, SolverError::Fatal { .. }));
    }
}
