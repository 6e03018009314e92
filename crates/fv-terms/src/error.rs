//! Error types for term assembly and equation solving.

use fv_core::error::{ErrorKind, FvError};
use fv_solver::SolverError;
use fv_vars::VarError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TermError {
    #[error("Variable error: {0}")]
    Var(#[from] VarError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Boundary conditions {first} and {second} overlap on faces {faces:?}")]
    ConflictingBoundary {
        first: usize,
        second: usize,
        faces: Vec<usize>,
    },

    #[error("Constraints {first} and {second} both pin cells {cells:?}")]
    ConflictingConstraint {
        first: usize,
        second: usize,
        cells: Vec<usize>,
    },

    #[error("Boundary condition on interior face {face}")]
    InteriorFace { face: usize },

    #[error("Face {face} out of range (face count {len})")]
    FaceOutOfRange { face: usize, len: usize },

    #[error("Cell {cell} out of range (cell count {len})")]
    CellOutOfRange { cell: usize, len: usize },

    #[error("Invalid {what}")]
    Invalid { what: String },

    #[error("Non-finite {what}")]
    NonFinite { what: String },
}

pub type TermResult<T> = Result<T, TermError>;

impl TermError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TermError::Var(e) => e.kind(),
            TermError::Solver(e) => e.kind(),
            TermError::NonFinite { .. } => ErrorKind::NumericalDegeneracy,
            TermError::ConflictingBoundary { .. }
            | TermError::ConflictingConstraint { .. }
            | TermError::InteriorFace { .. }
            | TermError::FaceOutOfRange { .. }
            | TermError::CellOutOfRange { .. }
            | TermError::Invalid { .. } => ErrorKind::Configuration,
        }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        TermError::Invalid { what: what.into() }
    }
}

impl From<TermError> for FvError {
    fn from(e: TermError) -> Self {
        match e {
            TermError::Var(e) => e.into(),
            TermError::Solver(e) => e.into(),
            TermError::NonFinite { .. } => FvError::NonFinite {
                what: "assembled system",
                value: f64::NAN,
            },
            other => FvError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
