//! Algebraic back-end for assembled finite-volume systems.
//!
//! Assembly produces a sparse matrix and a right-hand side; this crate stores
//! them (`nalgebra_sparse` COO → CSR), solves them through the pluggable
//! `LinearSolver` capability (dense LU, or CG, restarted GMRES and BiCGStab
//! from `kryst`), and drives nonlinear problems with a damped Newton iteration whose
//! residual callback can ask for a smaller step instead of failing.

pub mod error;
pub mod jacobian;
pub mod linear;
pub mod newton;
pub mod sparse;
pub mod system;

pub use error::{SolverError, SolverResult};
pub use jacobian::finite_difference_jacobian;
pub use linear::{
    BiCgStab, ConjugateGradient, DirectLu, Gmres, GmresConfig, IterativeConfig, LinearSolution,
    LinearSolver,
};
pub use newton::{NewtonConfig, NewtonResult, NonlinearProblem, ResidualFailure, newton_solve};
pub use sparse::{CooMatrix, CsrMatrix, CsrMatrixExt};
pub use system::LinearSystem;
