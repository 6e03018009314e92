//! Structured Cartesian grids.
//!
//! Face numbering for `Grid2D`: all x-normal faces first (row by row,
//! `(nx + 1) * ny` of them), then all y-normal faces (`nx * (ny + 1)`).

use fv_core::Real;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{FaceSpec, MeshGeometry};
use crate::mesh::{FaceSet, Mesh, Point};

fn check_spacing(n: usize, d: Real, what: &'static str) -> MeshResult<()> {
    if n == 0 || !(d > 0.0) || !d.is_finite() {
        return Err(MeshError::InvalidGrid { what });
    }
    Ok(())
}

/// Uniform 1D grid of `nx` cells of width `dx` with unit cross-section.
#[derive(Debug, Clone)]
pub struct Grid1D {
    nx: usize,
    dx: Real,
    geometry: MeshGeometry,
}

impl Grid1D {
    pub fn new(nx: usize, dx: Real) -> MeshResult<Self> {
        check_spacing(nx, dx, "Grid1D needs nx > 0 and dx > 0")?;

        let mut faces = Vec::with_capacity(nx + 1);
        for j in 0..=nx {
            let center = [j as Real * dx, 0.0, 0.0];
            let face = if j == 0 {
                FaceSpec {
                    id1: 0,
                    id2: None,
                    oriented_area: [-1.0, 0.0, 0.0],
                    center,
                }
            } else if j == nx {
                FaceSpec {
                    id1: nx - 1,
                    id2: None,
                    oriented_area: [1.0, 0.0, 0.0],
                    center,
                }
            } else {
                FaceSpec {
                    id1: j - 1,
                    id2: Some(j),
                    oriented_area: [1.0, 0.0, 0.0],
                    center,
                }
            };
            faces.push(face);
        }

        let centers = (0..nx)
            .map(|i| [(i as Real + 0.5) * dx, 0.0, 0.0])
            .collect();
        let geometry = MeshGeometry::new(1, &faces, centers, vec![dx; nx])?;
        Ok(Self { nx, dx, geometry })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn dx(&self) -> Real {
        self.dx
    }

    pub fn length(&self) -> Real {
        self.nx as Real * self.dx
    }

    pub fn faces_left(&self) -> FaceSet {
        FaceSet::new([0])
    }

    pub fn faces_right(&self) -> FaceSet {
        FaceSet::new([self.nx])
    }

    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }
}

/// Uniform 2D grid with unit depth.
#[derive(Debug, Clone)]
pub struct Grid2D {
    nx: usize,
    ny: usize,
    dx: Real,
    dy: Real,
    geometry: MeshGeometry,
}

impl Grid2D {
    pub fn new(nx: usize, ny: usize, dx: Real, dy: Real) -> MeshResult<Self> {
        check_spacing(nx, dx, "Grid2D needs nx > 0 and dx > 0")?;
        check_spacing(ny, dy, "Grid2D needs ny > 0 and dy > 0")?;

        let cell = |i: usize, j: usize| i + j * nx;
        let mut faces = Vec::with_capacity((nx + 1) * ny + nx * (ny + 1));

        // x-normal faces
        for j in 0..ny {
            for i in 0..=nx {
                let center = [i as Real * dx, (j as Real + 0.5) * dy, 0.0];
                let (id1, id2, sign) = if i == 0 {
                    (cell(0, j), None, -1.0)
                } else if i == nx {
                    (cell(nx - 1, j), None, 1.0)
                } else {
                    (cell(i - 1, j), Some(cell(i, j)), 1.0)
                };
                faces.push(FaceSpec {
                    id1,
                    id2,
                    oriented_area: [sign * dy, 0.0, 0.0],
                    center,
                });
            }
        }

        // y-normal faces
        for j in 0..=ny {
            for i in 0..nx {
                let center = [(i as Real + 0.5) * dx, j as Real * dy, 0.0];
                let (id1, id2, sign) = if j == 0 {
                    (cell(i, 0), None, -1.0)
                } else if j == ny {
                    (cell(i, ny - 1), None, 1.0)
                } else {
                    (cell(i, j - 1), Some(cell(i, j)), 1.0)
                };
                faces.push(FaceSpec {
                    id1,
                    id2,
                    oriented_area: [0.0, sign * dx, 0.0],
                    center,
                });
            }
        }

        let mut centers = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                centers.push([(i as Real + 0.5) * dx, (j as Real + 0.5) * dy, 0.0]);
            }
        }

        let geometry = MeshGeometry::new(2, &faces, centers, vec![dx * dy; nx * ny])?;
        Ok(Self {
            nx,
            ny,
            dx,
            dy,
            geometry,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn spacing(&self) -> (Real, Real) {
        (self.dx, self.dy)
    }

    fn boundary(&self, predicate: impl Fn(&Point) -> bool) -> FaceSet {
        self.faces_where(&predicate)
    }

    pub fn faces_left(&self) -> FaceSet {
        let tol = 1e-9 * self.dx;
        self.boundary(|c| c[0] <= tol)
    }

    pub fn faces_right(&self) -> FaceSet {
        let x = self.nx as Real * self.dx;
        let tol = 1e-9 * self.dx;
        self.boundary(|c| c[0] >= x - tol)
    }

    pub fn faces_bottom(&self) -> FaceSet {
        let tol = 1e-9 * self.dy;
        self.boundary(|c| c[1] <= tol)
    }

    pub fn faces_top(&self) -> FaceSet {
        let y = self.ny as Real * self.dy;
        let tol = 1e-9 * self.dy;
        self.boundary(|c| c[1] >= y - tol)
    }

    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }
}

impl Mesh for Grid1D {
    fn dim(&self) -> usize {
        1
    }

    fn cell_count(&self) -> usize {
        self.geometry.cell_count()
    }

    fn face_count(&self) -> usize {
        self.geometry.face_count()
    }

    fn adjacent_cell_ids(&self) -> (&[usize], &[usize]) {
        self.geometry.adjacent_cell_ids()
    }

    fn oriented_face_areas(&self) -> &[Point] {
        self.geometry.oriented_face_areas()
    }

    fn cell_centers(&self) -> &[Point] {
        self.geometry.cell_centers()
    }

    fn face_centers(&self) -> &[Point] {
        self.geometry.face_centers()
    }

    fn cell_volumes(&self) -> &[Real] {
        self.geometry.cell_volumes()
    }
}

impl Mesh for Grid2D {
    fn dim(&self) -> usize {
        2
    }

    fn cell_count(&self) -> usize {
        self.geometry.cell_count()
    }

    fn face_count(&self) -> usize {
        self.geometry.face_count()
    }

    fn adjacent_cell_ids(&self) -> (&[usize], &[usize]) {
        self.geometry.adjacent_cell_ids()
    }

    fn oriented_face_areas(&self) -> &[Point] {
        self.geometry.oriented_face_areas()
    }

    fn cell_centers(&self) -> &[Point] {
        self.geometry.cell_centers()
    }

    fn face_centers(&self) -> &[Point] {
        self.geometry.face_centers()
    }

    fn cell_volumes(&self) -> &[Real] {
        self.geometry.cell_volumes()
    }
}
