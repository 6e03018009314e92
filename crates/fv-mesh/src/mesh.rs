//! The mesh collaborator interface.

use fv_core::Real;

/// Coordinates and vectors are always stored with three slots; only the
/// first `dim()` are meaningful.
pub type Point = [Real; 3];

/// Sorted, de-duplicated set of face indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceSet(Vec<usize>);

impl FaceSet {
    pub fn new(faces: impl IntoIterator<Item = usize>) -> Self {
        let mut faces: Vec<usize> = faces.into_iter().collect();
        faces.sort_unstable();
        faces.dedup();
        Self(faces)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, face: usize) -> bool {
        self.0.binary_search(&face).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &FaceSet) -> FaceSet {
        FaceSet::new(self.iter().chain(other.iter()))
    }

    /// Faces present in both sets (ascending).
    pub fn intersection(&self, other: &FaceSet) -> FaceSet {
        FaceSet(self.iter().filter(|&f| other.contains(f)).collect())
    }
}

impl FromIterator<usize> for FaceSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        FaceSet::new(iter)
    }
}

/// Geometry and connectivity the finite-volume core consumes.
///
/// Conventions:
/// - `adjacent_cell_ids()` returns `(id1, id2)`; exterior faces carry `id2 == id1`.
/// - Oriented areas point from `id1` towards `id2`, and outward on the boundary.
/// - All slices are indexed by cell or face index and never change length.
pub trait Mesh: Send + Sync {
    /// Spatial dimension (1, 2 or 3).
    fn dim(&self) -> usize;

    fn cell_count(&self) -> usize;

    fn face_count(&self) -> usize;

    fn adjacent_cell_ids(&self) -> (&[usize], &[usize]);

    /// Face area times unit normal.
    fn oriented_face_areas(&self) -> &[Point];

    fn cell_centers(&self) -> &[Point];

    fn face_centers(&self) -> &[Point];

    fn cell_volumes(&self) -> &[Real];

    fn face_area(&self, face: usize) -> Real {
        norm(&self.oriented_face_areas()[face])
    }

    fn unit_normal(&self, face: usize) -> Point {
        let a = self.oriented_face_areas()[face];
        let mag = norm(&a);
        [a[0] / mag, a[1] / mag, a[2] / mag]
    }

    fn is_exterior(&self, face: usize) -> bool {
        let (id1, id2) = self.adjacent_cell_ids();
        id1[face] == id2[face]
    }

    /// Distance used by normal derivatives: center-to-center for interior
    /// faces, center-to-face on the boundary.
    fn cell_distance(&self, face: usize) -> Real {
        let (id1, id2) = self.adjacent_cell_ids();
        let centers = self.cell_centers();
        if id1[face] == id2[face] {
            distance(&centers[id1[face]], &self.face_centers()[face])
        } else {
            distance(&centers[id1[face]], &centers[id2[face]])
        }
    }

    /// Weight of the `id1` value in linear cell-to-face interpolation.
    fn interpolation_weight(&self, face: usize) -> Real {
        let (id1, id2) = self.adjacent_cell_ids();
        if id1[face] == id2[face] {
            return 1.0;
        }
        let centers = self.cell_centers();
        let fc = &self.face_centers()[face];
        let d1 = distance(&centers[id1[face]], fc);
        let d2 = distance(&centers[id2[face]], fc);
        d2 / (d1 + d2)
    }

    fn exterior_faces(&self) -> FaceSet {
        (0..self.face_count())
            .filter(|&f| self.is_exterior(f))
            .collect()
    }

    /// Exterior faces whose center satisfies `predicate`.
    fn faces_where(&self, predicate: &dyn Fn(&Point) -> bool) -> FaceSet {
        let centers = self.face_centers();
        (0..self.face_count())
            .filter(|&f| self.is_exterior(f) && predicate(&centers[f]))
            .collect()
    }

    /// Cells whose center satisfies `predicate`, ascending.
    fn cells_where(&self, predicate: &dyn Fn(&Point) -> bool) -> Vec<usize> {
        self.cell_centers()
            .iter()
            .enumerate()
            .filter(|(_, c)| predicate(c))
            .map(|(i, _)| i)
            .collect()
    }
}

pub(crate) fn norm(v: &Point) -> Real {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub(crate) fn distance(a: &Point, b: &Point) -> Real {
    norm(&[a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}
