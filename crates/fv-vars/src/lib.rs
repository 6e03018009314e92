//! fv-vars: cell- and face-valued variables with lazy, dependency-tracked
//! recomputation.
//!
//! Provides:
//! - `Field` storage with element shape `(components...)` and trailing length N
//! - `VarGraph`, an arena of primary and derived variables with generation stamps
//! - Expression nodes (`Expr`) built through combinator methods on the graph
//! - Derived-quantity operators: gradients, magnitude, interpolation, Roe splitting
//!
//! # Example
//!
//! ```
//! use fv_mesh::Grid1D;
//! use fv_vars::VarGraph;
//!
//! let mesh = Grid1D::new(4, 1.0).unwrap();
//! let mut graph = VarGraph::new(&mesh);
//! let phi = graph.cell_var("phi", 1.0).unwrap();
//! let twice = graph.scale(phi, 2.0).unwrap();
//! assert_eq!(graph.value(twice).unwrap().data(), &[2.0; 4]);
//!
//! graph.set_uniform(phi, 3.0).unwrap();
//! assert_eq!(graph.value(twice).unwrap().data(), &[6.0; 4]);
//! ```

pub mod error;
pub mod expr;
pub mod field;
pub mod graph;
pub mod ops;
pub mod roe;

pub use error::{VarError, VarResult};
pub use expr::{BinaryOp, Expr, Interpolation, UnaryOp};
pub use field::{Field, Location};
pub use graph::VarGraph;
pub use roe::abs_matrix;
