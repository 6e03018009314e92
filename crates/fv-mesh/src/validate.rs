//! Mesh validation logic.

use fv_core::Real;

use crate::error::{MeshError, MeshResult};
use crate::mesh::{Point, norm};

pub(crate) fn validate_dimension(dim: usize) -> MeshResult<()> {
    if (1..=3).contains(&dim) {
        Ok(())
    } else {
        Err(MeshError::InvalidDimension { dim })
    }
}

/// Cell arrays must agree in length and volumes must be positive.
pub(crate) fn validate_cells(centers: &[Point], volumes: &[Real]) -> MeshResult<()> {
    if volumes.len() != centers.len() {
        return Err(MeshError::LengthMismatch {
            what: "cell volumes",
            expected: centers.len(),
            actual: volumes.len(),
        });
    }
    for (i, &v) in volumes.iter().enumerate() {
        // written so NaN fails too
        if !(v > 0.0) {
            return Err(MeshError::NonPositive {
                what: "cell volume",
                index: i,
            });
        }
    }
    Ok(())
}

/// Every face must reference existing cells and have a non-zero area.
pub(crate) fn validate_faces(
    cell_count: usize,
    id1: &[usize],
    id2: &[usize],
    oriented_areas: &[Point],
) -> MeshResult<()> {
    for (face, (&a, &b)) in id1.iter().zip(id2).enumerate() {
        for cell in [a, b] {
            if cell >= cell_count {
                return Err(MeshError::InvalidCellRef { face, cell });
            }
        }
        if !(norm(&oriented_areas[face]) > 0.0) {
            return Err(MeshError::NonPositive {
                what: "face area",
                index: face,
            });
        }
    }
    Ok(())
}
