//! Boundary conditions and cell constraints.

use fv_core::Real;
use fv_mesh::{FaceSet, Mesh};

use crate::error::{TermError, TermResult};

/// Condition imposed on a subset of exterior faces.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryCondition {
    /// Prescribed face value of the unknown (every component).
    FixedValue { faces: FaceSet, value: Real },
    /// Prescribed outward diffusive flux density `D ∂φ/∂n`.
    FixedFlux { faces: FaceSet, flux: Real },
}

impl BoundaryCondition {
    pub fn fixed_value(faces: FaceSet, value: Real) -> Self {
        BoundaryCondition::FixedValue { faces, value }
    }

    pub fn fixed_flux(faces: FaceSet, flux: Real) -> Self {
        BoundaryCondition::FixedFlux { faces, flux }
    }

    pub fn faces(&self) -> &FaceSet {
        match self {
            BoundaryCondition::FixedValue { faces, .. }
            | BoundaryCondition::FixedFlux { faces, .. } => faces,
        }
    }

    fn condition(&self) -> FaceCondition {
        match *self {
            BoundaryCondition::FixedValue { value, .. } => FaceCondition::Value(value),
            BoundaryCondition::FixedFlux { flux, .. } => FaceCondition::Flux(flux),
        }
    }
}

/// Resolved condition of one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FaceCondition {
    Value(Real),
    Flux(Real),
}

/// Conditions of one equation, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundaryConditions {
    conditions: Vec<BoundaryCondition>,
}

impl BoundaryConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bc: BoundaryCondition) {
        self.conditions.push(bc);
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundaryCondition> {
        self.conditions.iter()
    }

    /// Check every condition against `mesh` and build the per-face lookup.
    ///
    /// Fails on faces out of range, on interior faces and on any face claimed
    /// by two conditions.
    pub fn resolve(&self, mesh: &dyn Mesh) -> TermResult<FaceConditions> {
        let len = mesh.face_count();
        let mut owner: Vec<Option<usize>> = vec![None; len];
        let mut by_face: Vec<Option<FaceCondition>> = vec![None; len];

        for (k, bc) in self.conditions.iter().enumerate() {
            for face in bc.faces().iter() {
                if face >= len {
                    return Err(TermError::FaceOutOfRange { face, len });
                }
                if !mesh.is_exterior(face) {
                    return Err(TermError::InteriorFace { face });
                }
                if let Some(first) = owner[face] {
                    let shared = self.conditions[first].faces().intersection(bc.faces());
                    return Err(TermError::ConflictingBoundary {
                        first,
                        second: k,
                        faces: shared.as_slice().to_vec(),
                    });
                }
                owner[face] = Some(k);
                by_face[face] = Some(bc.condition());
            }
        }
        Ok(FaceConditions { by_face })
    }
}

impl FromIterator<BoundaryCondition> for BoundaryConditions {
    fn from_iter<I: IntoIterator<Item = BoundaryCondition>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().collect(),
        }
    }
}

/// Per-face view of validated boundary conditions. Faces without an entry
/// carry zero flux.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceConditions {
    by_face: Vec<Option<FaceCondition>>,
}

impl FaceConditions {
    pub fn get(&self, face: usize) -> Option<FaceCondition> {
        self.by_face.get(face).copied().flatten()
    }

    pub fn fixed_value(&self, face: usize) -> Option<Real> {
        match self.get(face) {
            Some(FaceCondition::Value(v)) => Some(v),
            _ => None,
        }
    }
}

/// Row-replacement constraint: the listed cells take `value` in every
/// component.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub cells: Vec<usize>,
    pub value: Real,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::Grid1D;

    #[test]
    fn resolves_disjoint_conditions() {
        let mesh = Grid1D::new(3, 1.0).unwrap();
        let bcs: BoundaryConditions = [
            BoundaryCondition::fixed_value(mesh.faces_left(), 2.0),
            BoundaryCondition::fixed_flux(mesh.faces_right(), -1.0),
        ]
        .into_iter()
        .collect();
        let faces = bcs.resolve(&mesh).unwrap();
        assert_eq!(faces.fixed_value(0), Some(2.0));
        assert_eq!(faces.get(3), Some(FaceCondition::Flux(-1.0)));
        assert_eq!(faces.get(1), None);
    }

    #[test]
    fn overlapping_conditions_conflict() {
        let mesh = Grid1D::new(3, 1.0).unwrap();
        let bcs: BoundaryConditions = [
            BoundaryCondition::fixed_value(mesh.exterior_faces(), 0.0),
            BoundaryCondition::fixed_flux(mesh.faces_right(), 1.0),
        ]
        .into_iter()
        .collect();
        let err = bcs.resolve(&mesh).unwrap_err();
        assert_eq!(
            err,
            TermError::ConflictingBoundary {
                first: 0,
                second: 1,
                faces: vec![3]
            }
        );
    }

    #[test]
    fn interior_and_missing_faces_are_rejected() {
        let mesh = Grid1D::new(3, 1.0).unwrap();
        let interior: BoundaryConditions =
            std::iter::once(BoundaryCondition::fixed_value(FaceSet::new([1]), 0.0)).collect();
        assert_eq!(
            interior.resolve(&mesh).unwrap_err(),
            TermError::InteriorFace { face: 1 }
        );
        let missing: BoundaryConditions =
            std::iter::once(BoundaryCondition::fixed_value(FaceSet::new([9]), 0.0)).collect();
        assert!(matches!(
            missing.resolve(&mesh),
            Err(TermError::FaceOutOfRange { face: 9, len: 4 })
        ));
    }
}
