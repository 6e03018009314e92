//! Error types for time stepping.

use fv_core::error::{ErrorKind, FvError};
use fv_terms::TermError;
use fv_vars::VarError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Variable error: {0}")]
    Var(#[from] VarError),

    #[error("Equation '{equation}' failed in step {step}: {source}")]
    Equation {
        equation: String,
        step: u64,
        #[source]
        source: TermError,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidArg { .. } => ErrorKind::Configuration,
            SimError::Var(e) => e.kind(),
            SimError::Equation { source, .. } => source.kind(),
        }
    }
}

impl From<SimError> for FvError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::InvalidArg { what } => FvError::InvalidArg { what },
            SimError::Var(e) => e.into(),
            SimError::Equation { source, .. } => source.into(),
        }
    }
}
