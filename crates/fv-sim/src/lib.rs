//! Time stepping of coupled finite-volume equations.
//!
//! A [`TimeStepper`] owns the equations of a problem and advances them with
//! a fixed step: every step snapshots the old values, then solves each
//! equation once in declaration order.

pub mod error;
pub mod stepper;

pub use error::{SimError, SimResult};
pub use stepper::{SolveMode, StepReport, StepperOptions, TimeStepper};
