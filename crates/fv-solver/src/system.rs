use fv_core::Real;
use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};
use crate::sparse::{CsrMatrix, CsrMatrixExt};

/// Assembled `A x = b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: CsrMatrix<Real>,
    pub rhs: DVector<Real>,
}

impl LinearSystem {
    pub fn new(matrix: CsrMatrix<Real>, rhs: DVector<Real>) -> SolverResult<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::InvalidSystem {
                what: format!("matrix is {}x{}", matrix.nrows(), matrix.ncols()),
            });
        }
        if rhs.len() != matrix.nrows() {
            return Err(SolverError::InvalidSystem {
                what: format!("rhs has {} entries for {} rows", rhs.len(), matrix.nrows()),
            });
        }
        Ok(Self { matrix, rhs })
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// `A x - b`.
    pub fn residual(&self, x: &DVector<Real>) -> DVector<Real> {
        self.matrix.mul_vec(x) - &self.rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::CooMatrix;

    #[test]
    fn rejects_mismatched_rhs() {
        let err = LinearSystem::new(CsrMatrix::identity(2), DVector::zeros(3)).unwrap_err();
        assert!(err.to_string().contains("rhs has 3 entries"));
    }

    #[test]
    fn rejects_rectangular_matrix() {
        let m = CsrMatrix::from(&CooMatrix::new(2, 3));
        assert!(LinearSystem::new(m, DVector::zeros(2)).is_err());
    }

    #[test]
    fn residual_is_ax_minus_b() {
        let sys = LinearSystem::new(CsrMatrix::identity(2), DVector::from_vec(vec![1.0, 2.0])).unwrap();
        let r = sys.residual(&DVector::from_vec(vec![1.0, 0.0]));
        assert_eq!(r.as_slice(), &[0.0, -2.0]);
    }
}
