//! Linear solver capability and the bundled back-ends.
//!
//! The iterative solvers hand the assembled CSR matrix to `kryst`.

use std::fmt::Debug;
use std::sync::Arc;

use fv_core::Real;
use kryst::context::ksp_context::Workspace;
use kryst::error::KError;
use kryst::matrix::op::CsrOp;
use kryst::matrix::sparse::CsrMatrix as KrylovCsr;
use kryst::parallel::{NoComm, UniverseComm};
use kryst::preconditioner::PcSide;
use kryst::solver::LinearSolver as KrylovSolver;
use kryst::solver::{BiCgStabSolver, CgSolver, GmresSolver};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};
use crate::sparse::CsrMatrixExt;
use crate::system::LinearSystem;

/// Iteration controls shared by the Krylov solvers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterativeConfig {
    /// Stop once `|b - A x| <= tolerance * |b|` (or `<= tolerance` when `b == 0`).
    pub tolerance: Real,
    pub max_iterations: usize,
}

impl Default for IterativeConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl IterativeConfig {
    fn reference(&self, rhs: &DVector<Real>) -> Real {
        let b = rhs.norm();
        if b > 0.0 { b } else { 1.0 }
    }

    /// NaN never converges.
    fn converged(&self, residual_norm: Real, reference: Real) -> bool {
        residual_norm <= self.tolerance * reference
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GmresConfig {
    pub iterative: IterativeConfig,
    /// Krylov dimension between restarts.
    pub restart: usize,
}

impl Default for GmresConfig {
    fn default() -> Self {
        Self {
            iterative: IterativeConfig::default(),
            restart: 30,
        }
    }
}

/// Accepted solution of a linear system.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearSolution {
    pub x: DVector<Real>,
    pub iterations: usize,
    /// `|b - A x|` at `x`.
    pub residual_norm: Real,
}

/// Pluggable linear solver.
///
/// Implementations either return a finite solution meeting their tolerance
/// or an error; callers never see a partially converged iterate.
pub trait LinearSolver: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn solve(&self, system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<LinearSolution>;
}

fn check_shapes(system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<()> {
    if x0.len() != system.len() {
        return Err(SolverError::InvalidSystem {
            what: format!(
                "initial guess has {} entries for {} unknowns",
                x0.len(),
                system.len()
            ),
        });
    }
    Ok(())
}

fn finish(system: &LinearSystem, x: DVector<Real>, iterations: usize) -> SolverResult<LinearSolution> {
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::NonFinite {
            what: "linear solution".into(),
        });
    }
    let residual_norm = system.residual(&x).norm();
    Ok(LinearSolution {
        x,
        iterations,
        residual_norm,
    })
}

/// Dense LU factorization. Exact up to round-off; meant for small systems
/// and as a reference for the iterative solvers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectLu;

impl LinearSolver for DirectLu {
    fn name(&self) -> &'static str {
        "lu"
    }

    fn solve(&self, system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<LinearSolution> {
        check_shapes(system, x0)?;
        let dense: DMatrix<Real> = system.matrix.to_dense();
        let x = dense
            .lu()
            .solve(&system.rhs)
            .ok_or_else(|| SolverError::Singular {
                what: "LU factorization has a zero pivot".into(),
            })?;
        finish(system, x, 1)
    }
}

fn krylov_operator(system: &LinearSystem) -> CsrOp {
    let (offsets, cols, values) = system.matrix.csr_data();
    let n = system.len();
    CsrOp::new(Arc::new(KrylovCsr::from_csr(
        n,
        n,
        offsets.to_vec(),
        cols.to_vec(),
        values.to_vec(),
    )))
}

/// Runs a kryst solver on the correction `A d = b - A x0` and accepts
/// `x0 + d` only if the true residual meets `config`.
///
/// `make` receives the relative tolerance to hand to the Krylov iteration.
fn krylov_solve<S, F>(
    name: &'static str,
    config: &IterativeConfig,
    system: &LinearSystem,
    x0: &DVector<Real>,
    make: F,
) -> SolverResult<LinearSolution>
where
    S: KrylovSolver<Error = KError>,
    F: FnOnce(Real) -> S,
{
    check_shapes(system, x0)?;
    let target = config.tolerance * config.reference(&system.rhs);
    let r0 = &system.rhs - system.matrix.mul_vec(x0);
    let r0_norm = r0.norm();
    debug!(solver = name, iter = 0, residual = r0_norm);
    if !r0_norm.is_finite() {
        return Err(SolverError::NonFinite {
            what: format!("{name} initial residual"),
        });
    }
    if r0_norm <= target {
        return finish(system, x0.clone(), 0);
    }

    let op = krylov_operator(system);
    // margin for the gap between the recursive and the true residual
    let mut solver = make(0.5 * target / r0_norm);
    let mut d = vec![0.0; system.len()];
    let mut work = Workspace::new(system.len());
    let stats = solver
        .solve(
            &op,
            None,
            r0.as_slice(),
            &mut d,
            PcSide::Left,
            &UniverseComm::NoComm(NoComm),
            None,
            Some(&mut work),
        )
        .map_err(|e| {
            warn!(solver = name, error = %e, "krylov iteration failed");
            SolverError::ConvergenceFailed {
                what: format!("{name}: {e}"),
            }
        })?;

    let x = x0 + DVector::from_vec(d);
    let r_norm = system.residual(&x).norm();
    debug!(solver = name, iter = stats.iterations, residual = r_norm);
    if !r_norm.is_finite() {
        return Err(SolverError::NonFinite {
            what: format!("{name} residual after {} iterations", stats.iterations),
        });
    }
    if !config.converged(r_norm, config.reference(&system.rhs)) {
        warn!(solver = name, residual = r_norm, "iteration cap reached");
        return Err(SolverError::ConvergenceFailed {
            what: format!(
                "{name} stopped after {} iterations ({:?}), residual = {r_norm}",
                stats.iterations, stats.reason
            ),
        });
    }
    finish(system, x, stats.iterations)
}

/// Conjugate gradient, for symmetric definite systems.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConjugateGradient {
    pub config: IterativeConfig,
}

impl ConjugateGradient {
    pub fn new(config: IterativeConfig) -> Self {
        Self { config }
    }
}

impl LinearSolver for ConjugateGradient {
    fn name(&self) -> &'static str {
        "cg"
    }

    fn solve(&self, system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<LinearSolution> {
        let max = self.config.max_iterations;
        krylov_solve(self.name(), &self.config, system, x0, |rtol| CgSolver::new(rtol, max))
    }
}

/// Restarted GMRES.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gmres {
    pub config: GmresConfig,
}

impl Gmres {
    pub fn new(config: GmresConfig) -> Self {
        Self { config }
    }
}

impl LinearSolver for Gmres {
    fn name(&self) -> &'static str {
        "gmres"
    }

    fn solve(&self, system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<LinearSolution> {
        let cfg = &self.config;
        let restart = cfg.restart.clamp(1, system.len().max(1));
        krylov_solve(self.name(), &cfg.iterative, system, x0, |rtol| {
            let mut gmres = GmresSolver::new(restart, rtol, cfg.iterative.max_iterations);
            // relative test only
            gmres.conv.atol = 0.0;
            gmres
        })
    }
}

/// BiCGStab, for nonsymmetric systems where GMRES restarts stall.
#[derive(Clone, Copy, Debug, Default)]
pub struct BiCgStab {
    pub config: IterativeConfig,
}

impl BiCgStab {
    pub fn new(config: IterativeConfig) -> Self {
        Self { config }
    }
}

impl LinearSolver for BiCgStab {
    fn name(&self) -> &'static str {
        "bicgstab"
    }

    fn solve(&self, system: &LinearSystem, x0: &DVector<Real>) -> SolverResult<LinearSolution> {
        let max = self.config.max_iterations;
        krylov_solve(self.name(), &self.config, system, x0, |rtol| BiCgStabSolver {
            atol: 0.0,
            ..BiCgStabSolver::new(rtol, max)
        })
    }
}
