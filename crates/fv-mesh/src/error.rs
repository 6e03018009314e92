//! Mesh-specific error types.

use fv_core::{ErrorKind, FvError};

/// Mesh construction and validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Spatial dimension outside 1..=3.
    InvalidDimension { dim: usize },

    /// A per-cell or per-face array has the wrong length.
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A face refers to a cell that doesn't exist.
    InvalidCellRef { face: usize, cell: usize },

    /// A geometric quantity that must be positive is not.
    NonPositive { what: &'static str, index: usize },

    /// A structured grid was requested with zero cells or a bad spacing.
    InvalidGrid { what: &'static str },
}

pub type MeshResult<T> = Result<T, MeshError>;

impl MeshError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::InvalidDimension { dim } => {
                write!(f, "Mesh dimension {} is not in 1..=3", dim)
            }
            MeshError::LengthMismatch {
                what,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} has length {} (expected {})",
                    what, actual, expected
                )
            }
            MeshError::InvalidCellRef { face, cell } => {
                write!(f, "Face {} refers to non-existent cell {}", face, cell)
            }
            MeshError::NonPositive { what, index } => {
                write!(f, "{} at index {} must be positive", what, index)
            }
            MeshError::InvalidGrid { what } => write!(f, "Invalid grid: {}", what),
        }
    }
}

impl std::error::Error for MeshError {}

impl From<MeshError> for FvError {
    fn from(err: MeshError) -> Self {
        FvError::Invariant {
            what: err.to_string(),
        }
    }
}
