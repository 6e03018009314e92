//! Assembly state shared by the terms of one equation.

use fv_core::{Real, VarId};
use fv_mesh::Mesh;
use fv_solver::sparse::{push_checked, without_rows};
use fv_solver::{CooMatrix, CsrMatrix, LinearSystem, SolverError};
use fv_vars::{Field, VarGraph};
use nalgebra::DVector;

use crate::boundary::FaceConditions;
use crate::error::TermResult;

/// Read-only inputs of one assembly pass.
pub struct AssemblyContext<'a, 'm> {
    pub graph: &'a VarGraph<'m>,
    pub unknown: VarId,
    /// Unknown components per cell.
    pub nequ: usize,
    pub dt: Real,
    pub faces: &'a FaceConditions,
}

impl<'a, 'm> AssemblyContext<'a, 'm> {
    pub fn mesh(&self) -> &'m dyn Mesh {
        self.graph.mesh()
    }

    /// Current value of the unknown.
    pub fn unknown_field(&self) -> TermResult<&'a Field> {
        Ok(self.graph.field(self.unknown)?)
    }
}

/// Accumulates `Σ ±M` and `Σ ±s` over the terms of an equation.
///
/// Unknown component `c` of cell `i` maps to row and column `c * N + i`.
/// Terms write unsigned contributions; the equation sets the sign of the
/// side the term sits on.
#[derive(Debug)]
pub struct TermSystem {
    cells: usize,
    nequ: usize,
    sign: Real,
    matrix: CooMatrix<Real>,
    source: DVector<Real>,
    /// First entry written outside the system.
    invalid: Option<SolverError>,
}

impl TermSystem {
    pub fn new(cells: usize, nequ: usize) -> Self {
        let n = cells * nequ;
        Self {
            cells,
            nequ,
            sign: 1.0,
            matrix: CooMatrix::new(n, n),
            source: DVector::zeros(n),
            invalid: None,
        }
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn nequ(&self) -> usize {
        self.nequ
    }

    /// +1 for left-hand-side terms, -1 for right-hand-side terms.
    pub fn sign(&self) -> Real {
        self.sign
    }

    pub(crate) fn set_sign(&mut self, sign: Real) {
        self.sign = sign;
    }

    pub fn index(&self, component: usize, cell: usize) -> usize {
        component * self.cells + cell
    }

    pub fn add_matrix(&mut self, row: usize, col: usize, value: Real) {
        if let Err(e) = push_checked(&mut self.matrix, row, col, self.sign * value) {
            self.invalid.get_or_insert(e);
        }
    }

    pub fn add_source(&mut self, row: usize, value: Real) {
        self.source[row] += self.sign * value;
    }

    /// Replace rows with identity and fix their right-hand side.
    pub(crate) fn constrain(&mut self, rows: &[usize], value: Real) {
        self.matrix = without_rows(&self.matrix, rows);
        for &r in rows {
            self.add_unsigned(r, r, 1.0);
            // b = -s
            self.source[r] = -value;
        }
    }

    fn add_unsigned(&mut self, row: usize, col: usize, value: Real) {
        if let Err(e) = push_checked(&mut self.matrix, row, col, value) {
            self.invalid.get_or_insert(e);
        }
    }

    /// `A = Σ ±M`, `b = -Σ ±s`.
    pub fn finish(self) -> TermResult<LinearSystem> {
        if let Some(e) = self.invalid {
            return Err(e.into());
        }
        let matrix = CsrMatrix::from(&self.matrix);
        Ok(LinearSystem::new(matrix, -self.source)?)
    }
}
