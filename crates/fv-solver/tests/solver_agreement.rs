//! The bundled solvers must agree with each other on well-posed systems.

use fv_core::Real;
use fv_solver::{
    BiCgStab, ConjugateGradient, CooMatrix, CsrMatrix, DirectLu, Gmres, LinearSolver,
    LinearSystem, NewtonConfig, NonlinearProblem, ResidualFailure, newton_solve,
};
use nalgebra::DVector;
use proptest::prelude::*;

/// Symmetric, strictly diagonally dominant tridiagonal system.
fn spd_system(off: &[Real], rhs: &[Real]) -> LinearSystem {
    let n = rhs.len();
    let mut b = CooMatrix::new(n, n);
    for i in 0..n {
        let left = if i > 0 { off[i - 1] } else { 0.0 };
        let right = if i + 1 < n { off[i] } else { 0.0 };
        b.push(i, i, left.abs() + right.abs() + 1.0);
        if i > 0 {
            b.push(i, i - 1, left);
        }
        if i + 1 < n {
            b.push(i, i + 1, right);
        }
    }
    LinearSystem::new(CsrMatrix::from(&b), DVector::from_column_slice(rhs)).unwrap()
}

struct Linear<'a>(&'a LinearSystem);

impl NonlinearProblem for Linear<'_> {
    fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
        Ok(self.0.residual(x))
    }
}

proptest! {
    #[test]
    fn krylov_solvers_and_lu_agree(
        (off, rhs) in (2usize..25).prop_flat_map(|n| (
            proptest::collection::vec(-3.0..3.0_f64, n - 1),
            proptest::collection::vec(-10.0..10.0_f64, n),
        ))
    ) {
        let sys = spd_system(&off, &rhs);
        let x0 = DVector::zeros(rhs.len());
        let lu = DirectLu.solve(&sys, &x0).unwrap().x;
        let cg = ConjugateGradient::default().solve(&sys, &x0).unwrap().x;
        let gmres = Gmres::default().solve(&sys, &x0).unwrap().x;
        let bicgstab = BiCgStab::default().solve(&sys, &x0).unwrap().x;
        let scale = 1.0 + lu.amax();
        prop_assert!((&cg - &lu).amax() < 1e-8 * scale);
        prop_assert!((&gmres - &lu).amax() < 1e-8 * scale);
        prop_assert!((&bicgstab - &lu).amax() < 1e-8 * scale);
    }

    #[test]
    fn newton_matches_linear_solve(
        rhs in proptest::collection::vec(-10.0..10.0_f64, 6),
        off in proptest::collection::vec(-3.0..3.0_f64, 5),
    ) {
        let sys = spd_system(&off, &rhs);
        let direct = DirectLu.solve(&sys, &DVector::zeros(6)).unwrap().x;
        let newton = newton_solve(&mut Linear(&sys), DVector::zeros(6), &NewtonConfig::default())
            .unwrap()
            .x;
        prop_assert!((&newton - &direct).amax() < 1e-8 * (1.0 + direct.amax()));
    }
}

#[test]
fn warm_start_at_solution_needs_no_iterations() {
    let sys = spd_system(&[1.0, -1.0], &[1.0, 2.0, 3.0]);
    let exact = DirectLu.solve(&sys, &DVector::zeros(3)).unwrap().x;
    let sol = ConjugateGradient::default().solve(&sys, &exact).unwrap();
    assert_eq!(sol.iterations, 0);
}
