//! fv-core: stable foundation for finvol.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for variable-graph nodes)
//! - error (shared error type and the error-kind taxonomy)

pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{ErrorKind, FvError, FvResult};
pub use ids::*;
pub use numeric::*;
