//! fv-mesh: the mesh collaborator seen by the finite-volume core.
//!
//! Provides:
//! - The `Mesh` trait (cell/face counts, adjacency, oriented areas, centers)
//! - `FaceSet`, the face subsets boundary conditions are attached to
//! - `MeshGeometry`, a validated flat storage implementing `Mesh`
//! - Structured `Grid1D` / `Grid2D` meshes for tests and small problems
//!
//! # Example
//!
//! ```
//! use fv_mesh::{Grid1D, Mesh};
//!
//! let grid = Grid1D::new(4, 0.25).unwrap();
//! assert_eq!(grid.cell_count(), 4);
//! assert_eq!(grid.face_count(), 5);
//! assert_eq!(grid.exterior_faces().len(), 2);
//! ```

pub mod error;
pub mod geometry;
pub mod grid;
pub mod mesh;
pub(crate) mod validate;

pub use error::{MeshError, MeshResult};
pub use geometry::{FaceSpec, MeshGeometry};
pub use grid::{Grid1D, Grid2D};
pub use mesh::{FaceSet, Mesh, Point};
