//! Numeric storage for variable values.

use fv_core::Real;

use crate::error::{VarError, VarResult};

/// Where a variable lives on the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    Cell,
    Face,
}

/// Array of shape `(elem_shape..., len)` stored component-major:
/// element component `c` of entity `i` is `data[c * len + i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    location: Location,
    elem_shape: Vec<usize>,
    len: usize,
    data: Vec<Real>,
}

pub(crate) fn component_count(elem_shape: &[usize]) -> usize {
    elem_shape.iter().product()
}

impl Field {
    pub fn new(
        location: Location,
        elem_shape: Vec<usize>,
        len: usize,
        data: Vec<Real>,
    ) -> VarResult<Self> {
        let expected = component_count(&elem_shape) * len;
        if data.len() != expected {
            let mut full = elem_shape.clone();
            full.push(len);
            return Err(VarError::shape("field data", &full, &[data.len()]));
        }
        Ok(Self {
            location,
            elem_shape,
            len,
            data,
        })
    }

    pub fn uniform(location: Location, elem_shape: Vec<usize>, len: usize, value: Real) -> Self {
        let n = component_count(&elem_shape) * len;
        Self {
            location,
            elem_shape,
            len,
            data: vec![value; n],
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn elem_shape(&self) -> &[usize] {
        &self.elem_shape
    }

    /// Trailing length: number of cells or faces.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of element components (1 for scalars).
    pub fn components(&self) -> usize {
        component_count(&self.elem_shape)
    }

    pub fn data(&self) -> &[Real] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [Real] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<Real> {
        self.data
    }

    /// All entities of one element component.
    pub fn component(&self, c: usize) -> &[Real] {
        &self.data[c * self.len..(c + 1) * self.len]
    }

    pub fn get(&self, c: usize, i: usize) -> Real {
        self.data[c * self.len + i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_major_layout() {
        let f = Field::new(
            Location::Cell,
            vec![2],
            3,
            vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0],
        )
        .unwrap();
        assert_eq!(f.components(), 2);
        assert_eq!(f.component(1), &[10.0, 20.0, 30.0]);
        assert_eq!(f.get(0, 2), 3.0);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Field::new(Location::Face, vec![2, 2], 3, vec![0.0; 11]).unwrap_err();
        assert!(matches!(err, VarError::ShapeMismatch { .. }));
    }

    #[test]
    fn scalar_has_one_component() {
        let f = Field::uniform(Location::Cell, vec![], 5, 0.5);
        assert_eq!(f.components(), 1);
        assert_eq!(f.data(), &[0.5; 5]);
    }
}
