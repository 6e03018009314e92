use thiserror::Error;

pub type FvResult<T> = Result<T, FvError>;

/// Broad classification shared by every error type in the workspace.
///
/// Callers use this to decide whether a failure is a setup mistake that must be
/// fixed, a solve that did not converge, or a numerical breakdown that was
/// propagated from an underlying routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Conflicting boundary conditions, derived-variable mutation, shape mismatch.
    Configuration,
    /// Solver hit its iteration cap, diverged, or met a singular system.
    Convergence,
    /// NaN/inf produced by an inherited numerical routine.
    NumericalDegeneracy,
}

#[derive(Error, Debug)]
pub enum FvError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },

    #[error("Convergence failed: {what}")]
    Convergence { what: String },
}

impl FvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FvError::NonFinite { .. } => ErrorKind::NumericalDegeneracy,
            FvError::Convergence { .. } => ErrorKind::Convergence,
            FvError::InvalidArg { .. } | FvError::IndexOob { .. } | FvError::Invariant { .. } => {
                ErrorKind::Configuration
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        let err = FvError::NonFinite {
            what: "residual",
            value: f64::NAN,
        };
        assert_eq!(err.kind(), ErrorKind::NumericalDegeneracy);

        let err = FvError::IndexOob {
            what: "cell",
            index: 4,
            len: 3,
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("index=4"));
    }
}
