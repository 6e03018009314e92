//! Term coefficients.

use fv_core::{Real, VarId};
use fv_mesh::{Mesh, Point};
use fv_vars::{Field, Interpolation, Location, VarGraph};

use crate::error::{TermError, TermResult};

/// Scalar coefficient of a term: a constant or a variable.
///
/// Field coefficients may be scalar or carry one value per unknown
/// component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Coefficient {
    Uniform(Real),
    Field(VarId),
}

impl From<Real> for Coefficient {
    fn from(v: Real) -> Self {
        Coefficient::Uniform(v)
    }
}

impl From<VarId> for Coefficient {
    fn from(id: VarId) -> Self {
        Coefficient::Field(id)
    }
}

impl Coefficient {
    pub fn var(&self) -> Option<VarId> {
        match self {
            Coefficient::Uniform(_) => None,
            Coefficient::Field(id) => Some(*id),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Coefficient::Uniform(v) if *v == 0.0)
    }

    /// Require a cell-located field.
    pub(crate) fn check_cells(&self, graph: &VarGraph<'_>, what: &str) -> TermResult<()> {
        if let Coefficient::Field(id) = self {
            if graph.location(*id)? != Location::Cell {
                return Err(TermError::invalid(format!(
                    "{what}: coefficient '{}' must live on cells",
                    graph.name(*id)?
                )));
            }
        }
        Ok(())
    }

    /// Face-located equivalent; cell fields are linearly interpolated.
    pub(crate) fn on_faces(&self, graph: &mut VarGraph<'_>) -> TermResult<Coefficient> {
        Ok(match *self {
            Coefficient::Field(id) if graph.location(id)? == Location::Cell => {
                Coefficient::Field(graph.interpolate(id, Interpolation::Linear)?)
            }
            other => other,
        })
    }

    pub(crate) fn view<'a>(
        &self,
        graph: &'a VarGraph<'_>,
        nequ: usize,
    ) -> TermResult<CoefficientView<'a>> {
        match *self {
            Coefficient::Uniform(v) => Ok(CoefficientView::Uniform(v)),
            Coefficient::Field(id) => {
                let field = graph.field(id)?;
                let comps = field.components();
                if comps != 1 && comps != nequ {
                    return Err(TermError::invalid(format!(
                        "coefficient '{}' has {comps} components for {nequ} equations",
                        graph.name(id)?
                    )));
                }
                Ok(CoefficientView::Field(field))
            }
        }
    }
}

/// Borrowed coefficient values during assembly.
pub(crate) enum CoefficientView<'a> {
    Uniform(Real),
    Field(&'a Field),
}

impl CoefficientView<'_> {
    /// Value for unknown component `c` at cell or face `i`.
    pub(crate) fn at(&self, c: usize, i: usize) -> Real {
        match self {
            CoefficientView::Uniform(v) => *v,
            CoefficientView::Field(f) => f.get(if f.components() == 1 { 0 } else { c }, i),
        }
    }
}

/// Advecting velocity of a convection term.
///
/// A scalar field is read as the speed along each face's oriented normal;
/// a field of shape `[dim]` is projected onto the oriented area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Velocity {
    Uniform(Point),
    Field(VarId),
}

impl From<Point> for Velocity {
    fn from(v: Point) -> Self {
        Velocity::Uniform(v)
    }
}

impl From<VarId> for Velocity {
    fn from(id: VarId) -> Self {
        Velocity::Field(id)
    }
}

impl Velocity {
    pub fn var(&self) -> Option<VarId> {
        match self {
            Velocity::Uniform(_) => None,
            Velocity::Field(id) => Some(*id),
        }
    }

    pub(crate) fn on_faces(&self, graph: &mut VarGraph<'_>) -> TermResult<Velocity> {
        let Velocity::Field(id) = *self else {
            return Ok(*self);
        };
        let comps = graph.components(id)?;
        let dim = graph.mesh().dim();
        if comps != 1 && comps != dim {
            return Err(TermError::invalid(format!(
                "velocity '{}' has {comps} components on a {dim}D mesh",
                graph.name(id)?
            )));
        }
        if graph.location(id)? == Location::Cell {
            return Ok(Velocity::Field(graph.interpolate(id, Interpolation::Linear)?));
        }
        Ok(*self)
    }

    /// Volumetric flux `u·A` through every face.
    pub(crate) fn face_fluxes(&self, graph: &VarGraph<'_>) -> TermResult<Vec<Real>> {
        let mesh = graph.mesh();
        let areas = mesh.oriented_face_areas();
        Ok(match *self {
            Velocity::Uniform(u) => areas
                .iter()
                .map(|a| u[0] * a[0] + u[1] * a[1] + u[2] * a[2])
                .collect(),
            Velocity::Field(id) => {
                let field = graph.field(id)?;
                (0..mesh.face_count())
                    .map(|f| {
                        if field.components() == 1 {
                            field.get(0, f) * mesh.face_area(f)
                        } else {
                            (0..field.components())
                                .map(|d| field.get(d, f) * areas[f][d])
                                .sum()
                        }
                    })
                    .collect()
            }
        })
    }
}
