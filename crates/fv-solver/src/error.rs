//! Error types for solver operations.

use fv_core::error::{ErrorKind, FvError};
use thiserror::Error;

/// Errors that can occur while storing or solving a system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid system: {what}")]
    InvalidSystem { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Non-finite solution: {what}")]
    NonFinite { what: String },

    #[error("Residual evaluation aborted: {what}")]
    Fatal { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::InvalidSystem { .. } | SolverError::Fatal { .. } => {
                ErrorKind::Configuration
            }
            SolverError::Singular { .. } | SolverError::ConvergenceFailed { .. } => {
                ErrorKind::Convergence
            }
            SolverError::NonFinite { .. } => ErrorKind::NumericalDegeneracy,
        }
    }
}

impl From<SolverError> for FvError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::InvalidSystem { what } | SolverError::Fatal { what } => {
                FvError::Invariant { what }
            }
            SolverError::Singular { what } | SolverError::ConvergenceFailed { what } => {
                FvError::Convergence { what }
            }
            SolverError::NonFinite { .. } => FvError::NonFinite {
                what: "solver output",
                value: f64::NAN,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_survive_conversion() {
        let errors = [
            SolverError::InvalidSystem { what: "rhs".into() },
            SolverError::Singular { what: "lu".into() },
            SolverError::NonFinite { what: "x".into() },
        ];
        for e in errors {
            let kind = e.kind();
            assert_eq!(FvError::from(e).kind(), kind);
        }
    }
}
