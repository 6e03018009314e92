//! Sparse matrix storage.
//!
//! Assembly accumulates triplets in a [`CooMatrix`]; compressing it into a
//! [`CsrMatrix`] sums duplicate entries.

use fv_core::Real;
use nalgebra::{DMatrix, DVector};
pub use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::error::{SolverError, SolverResult};

/// Convenience accessors on the compressed matrix used throughout the solvers.
pub trait CsrMatrixExt {
    /// Stored value, or 0 outside the pattern or the matrix.
    fn entry(&self, row: usize, col: usize) -> Real;

    fn mul_vec(&self, x: &DVector<Real>) -> DVector<Real>;

    fn to_dense(&self) -> DMatrix<Real>;
}

impl CsrMatrixExt for CsrMatrix<Real> {
    fn entry(&self, row: usize, col: usize) -> Real {
        self.get_entry(row, col)
            .map(|e| e.into_value())
            .unwrap_or(0.0)
    }

    fn mul_vec(&self, x: &DVector<Real>) -> DVector<Real> {
        self * x
    }

    fn to_dense(&self) -> DMatrix<Real> {
        DMatrix::from(self)
    }
}

/// Checked triplet insertion; [`CooMatrix::push`] panics out of range.
pub fn push_checked(
    coo: &mut CooMatrix<Real>,
    row: usize,
    col: usize,
    value: Real,
) -> SolverResult<()> {
    if row >= coo.nrows() || col >= coo.ncols() {
        return Err(SolverError::InvalidSystem {
            what: format!(
                "entry ({row}, {col}) outside {}x{} matrix",
                coo.nrows(),
                coo.ncols()
            ),
        });
    }
    coo.push(row, col, value);
    Ok(())
}

/// Copy of `coo` without any entry in `rows`.
pub fn without_rows(coo: &CooMatrix<Real>, rows: &[usize]) -> CooMatrix<Real> {
    let mut mask = vec![false; coo.nrows()];
    for &r in rows {
        if let Some(m) = mask.get_mut(r) {
            *m = true;
        }
    }
    let mut kept = CooMatrix::new(coo.nrows(), coo.ncols());
    for (r, c, &v) in coo.triplet_iter() {
        if !mask[r] {
            kept.push(r, c, v);
        }
    }
    kept
}
