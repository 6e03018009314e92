//! fv-terms: discretized operator terms and the equations built from them.
//!
//! Every term turns one continuum operator, integrated over each cell, into
//! an affine map `M φ + s` of the unknown. An `Equation` adds the terms of
//! its left side, subtracts those of its right side, injects boundary
//! conditions and cell constraints, and hands the result to a linear solver.
//!
//! # Example
//!
//! ```
//! use fv_mesh::Grid1D;
//! use fv_solver::DirectLu;
//! use fv_terms::{BoundaryCondition, DiffusionTerm, Equation};
//! use fv_vars::VarGraph;
//!
//! let mesh = Grid1D::new(10, 0.1).unwrap();
//! let mut graph = VarGraph::new(&mesh);
//! let phi = graph.cell_var("phi", 0.0).unwrap();
//!
//! let eq = Equation::builder("steady", phi)
//!     .add(DiffusionTerm::new(1.0))
//!     .boundary(BoundaryCondition::fixed_value(mesh.faces_left(), 0.0))
//!     .boundary(BoundaryCondition::fixed_value(mesh.faces_right(), 1.0))
//!     .solver(DirectLu)
//!     .build(&mut graph)
//!     .unwrap();
//! eq.solve(&mut graph, 1.0).unwrap();
//! let x = graph.value(phi).unwrap().data()[9];
//! assert!((x - 0.95).abs() < 1e-12);
//! ```

pub mod assembly;
pub mod boundary;
pub mod coefficient;
pub mod convection;
pub mod diffusion;
pub mod equation;
pub mod error;
pub mod source;
pub mod traits;
pub mod transient;

pub use assembly::{AssemblyContext, TermSystem};
pub use boundary::{BoundaryCondition, BoundaryConditions, FaceCondition, FaceConditions};
pub use coefficient::{Coefficient, Velocity};
pub use convection::{ConvectionScheme, ConvectionTerm};
pub use diffusion::{DiffusionTerm, ExplicitDiffusionTerm};
pub use equation::{
    Equation, EquationBuilder, JacobianMode, NonlinearOptions, NonlinearReport, SolveReport,
};
pub use error::{TermError, TermResult};
pub use source::{ImplicitSourceTerm, SourceTerm};
pub use traits::{GhostExchange, NoExchange, Term};
pub use transient::TransientTerm;
