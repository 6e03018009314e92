//! Flat, validated mesh storage.

use fv_core::Real;

use crate::error::MeshResult;
use crate::mesh::{Mesh, Point};
use crate::validate;

/// Immutable mesh geometry: per-face adjacency and areas, per-cell centers
/// and volumes.
///
/// This is what mesh generators hand to the core. Construction validates
/// lengths, cell references and positivity once so downstream code can
/// index freely.
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    pub(crate) dim: usize,
    pub(crate) id1: Vec<usize>,
    pub(crate) id2: Vec<usize>,
    pub(crate) oriented_areas: Vec<Point>,
    pub(crate) face_centers: Vec<Point>,
    pub(crate) cell_centers: Vec<Point>,
    pub(crate) cell_volumes: Vec<Real>,
}

/// Per-face input for [`MeshGeometry::new`].
#[derive(Debug, Clone, Copy)]
pub struct FaceSpec {
    pub id1: usize,
    /// `None` marks an exterior face.
    pub id2: Option<usize>,
    pub oriented_area: Point,
    pub center: Point,
}

impl MeshGeometry {
    pub fn new(
        dim: usize,
        faces: &[FaceSpec],
        cell_centers: Vec<Point>,
        cell_volumes: Vec<Real>,
    ) -> MeshResult<Self> {
        let id1: Vec<usize> = faces.iter().map(|f| f.id1).collect();
        let id2: Vec<usize> = faces.iter().map(|f| f.id2.unwrap_or(f.id1)).collect();
        let oriented_areas: Vec<Point> = faces.iter().map(|f| f.oriented_area).collect();
        let face_centers: Vec<Point> = faces.iter().map(|f| f.center).collect();

        validate::validate_dimension(dim)?;
        validate::validate_cells(&cell_centers, &cell_volumes)?;
        validate::validate_faces(cell_centers.len(), &id1, &id2, &oriented_areas)?;

        Ok(Self {
            dim,
            id1,
            id2,
            oriented_areas,
            face_centers,
            cell_centers,
            cell_volumes,
        })
    }
}

impl Mesh for MeshGeometry {
    fn dim(&self) -> usize {
        self.dim
    }

    fn cell_count(&self) -> usize {
        self.cell_centers.len()
    }

    fn face_count(&self) -> usize {
        self.id1.len()
    }

    fn adjacent_cell_ids(&self) -> (&[usize], &[usize]) {
        (&self.id1, &self.id2)
    }

    fn oriented_face_areas(&self) -> &[Point] {
        &self.oriented_areas
    }

    fn cell_centers(&self) -> &[Point] {
        &self.cell_centers
    }

    fn face_centers(&self) -> &[Point] {
        &self.face_centers
    }

    fn cell_volumes(&self) -> &[Real] {
        &self.cell_volumes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeshError;

    fn two_cells() -> (Vec<FaceSpec>, Vec<Point>, Vec<Real>) {
        let faces = vec![
            FaceSpec {
                id1: 0,
                id2: None,
                oriented_area: [-1.0, 0.0, 0.0],
                center: [0.0, 0.0, 0.0],
            },
            FaceSpec {
                id1: 0,
                id2: Some(1),
                oriented_area: [1.0, 0.0, 0.0],
                center: [1.0, 0.0, 0.0],
            },
            FaceSpec {
                id1: 1,
                id2: None,
                oriented_area: [1.0, 0.0, 0.0],
                center: [2.0, 0.0, 0.0],
            },
        ];
        (faces, vec![[0.5, 0.0, 0.0], [1.5, 0.0, 0.0]], vec![1.0, 1.0])
    }

    #[test]
    fn geometry_basic() {
        let (faces, centers, volumes) = two_cells();
        let geom = MeshGeometry::new(1, &faces, centers, volumes).unwrap();
        assert_eq!(geom.face_count(), 3);
        assert!(geom.is_exterior(0));
        assert!(!geom.is_exterior(1));
        assert_eq!(geom.cell_distance(1), 1.0);
        assert_eq!(geom.cell_distance(2), 0.5);
        assert_eq!(geom.interpolation_weight(1), 0.5);
    }

    #[test]
    fn geometry_rejects_bad_cell_ref() {
        let (mut faces, centers, volumes) = two_cells();
        faces[1].id2 = Some(7);
        let err = MeshGeometry::new(1, &faces, centers, volumes).unwrap_err();
        assert_eq!(err, MeshError::InvalidCellRef { face: 1, cell: 7 });
    }

    #[test]
    fn geometry_rejects_volume_length() {
        let (faces, centers, _) = two_cells();
        let err = MeshGeometry::new(1, &faces, centers, vec![1.0]).unwrap_err();
        assert!(matches!(err, MeshError::LengthMismatch { .. }));
    }
}
