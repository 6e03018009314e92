//! Error types for variable-graph operations.

use fv_core::{ErrorKind, FvError, VarId};
use thiserror::Error;

use crate::field::Location;

/// Errors raised while building, mutating or evaluating variables.
///
/// All of them are configuration errors: they abort the current assembly and
/// are never resolved silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VarError {
    #[error("variable '{name}' is derived, not assignable")]
    Derived { name: String },

    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Location mismatch for {what}: expected {expected:?}, got {actual:?}")]
    LocationMismatch {
        what: String,
        expected: Location,
        actual: Location,
    },

    #[error("Unknown variable {id}")]
    UnknownVar { id: VarId },

    #[error("Index {index} out of range for '{name}' (len={len})")]
    IndexOob {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("Variable '{name}' read before evaluation")]
    NotEvaluated { name: String },

    #[error("Variable arena is full")]
    ArenaFull,
}

pub type VarResult<T> = Result<T, VarError>;

impl VarError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    pub(crate) fn shape(what: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        VarError::ShapeMismatch {
            what: what.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl From<VarError> for FvError {
    fn from(e: VarError) -> Self {
        FvError::Invariant {
            what: e.to_string(),
        }
    }
}
