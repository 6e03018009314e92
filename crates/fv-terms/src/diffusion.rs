//! Diffusion terms.

use fv_core::{Real, VarId};
use fv_mesh::Mesh;
use fv_vars::{Location, VarGraph};

use crate::assembly::{AssemblyContext, TermSystem};
use crate::boundary::FaceCondition;
use crate::coefficient::{Coefficient, CoefficientView};
use crate::error::{TermError, TermResult};
use crate::traits::Term;

/// Face transmissibility `D_f |A_f| / d_f` for component `c`.
fn transmissibility(mesh: &dyn Mesh, coeff: &CoefficientView<'_>, c: usize, face: usize) -> Real {
    coeff.at(c, face) * mesh.face_area(face) / mesh.cell_distance(face)
}

/// `∇·(D ∇φ)` integrated over each cell, implicit in `φ`.
///
/// Interior faces couple their two cells with `D_f |A_f| / d_f`. On the
/// boundary a fixed value `g` adds `D_f |A_f| / d_bf` to the diagonal and
/// the same factor times `g` to the source, a fixed flux `q` adds `q |A_f|`
/// to the source; faces without a condition carry no flux.
#[derive(Debug, Clone)]
pub struct DiffusionTerm {
    coeff: Coefficient,
    face_coeff: Option<Coefficient>,
}

impl DiffusionTerm {
    pub fn new(coeff: impl Into<Coefficient>) -> Self {
        Self {
            coeff: coeff.into(),
            face_coeff: None,
        }
    }

    fn face_coeff(&self) -> Coefficient {
        self.face_coeff.unwrap_or(self.coeff)
    }

    fn face_view<'a>(&self, ctx: &AssemblyContext<'a, '_>) -> TermResult<CoefficientView<'a>> {
        let coeff = self.face_coeff();
        if let Some(id) = coeff.var() {
            if ctx.graph.location(id)? != Location::Face {
                return Err(TermError::invalid("diffusion coefficient used before binding"));
            }
        }
        coeff.view(ctx.graph, ctx.nequ)
    }
}

impl Term for DiffusionTerm {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, _unknown: VarId) -> TermResult<()> {
        self.face_coeff = Some(self.coeff.on_faces(graph)?);
        Ok(())
    }

    fn requires(&self) -> Vec<VarId> {
        self.face_coeff().var().into_iter().collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        let mesh = ctx.mesh();
        let coeff = self.face_view(ctx)?;
        let (id1, id2) = mesh.adjacent_cell_ids();

        for face in 0..mesh.face_count() {
            let (a, b) = (id1[face], id2[face]);
            for c in 0..ctx.nequ {
                let ra = sys.index(c, a);
                if a != b {
                    let t = transmissibility(mesh, &coeff, c, face);
                    let rb = sys.index(c, b);
                    sys.add_matrix(ra, ra, -t);
                    sys.add_matrix(ra, rb, t);
                    sys.add_matrix(rb, rb, -t);
                    sys.add_matrix(rb, ra, t);
                    continue;
                }
                match ctx.faces.get(face) {
                    Some(FaceCondition::Value(g)) => {
                        let t = transmissibility(mesh, &coeff, c, face);
                        sys.add_matrix(ra, ra, -t);
                        sys.add_source(ra, t * g);
                    }
                    Some(FaceCondition::Flux(q)) => {
                        sys.add_source(ra, q * mesh.face_area(face));
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

/// Same operator as [`DiffusionTerm`], evaluated on the current value and
/// placed entirely in the source.
#[derive(Debug, Clone)]
pub struct ExplicitDiffusionTerm {
    inner: DiffusionTerm,
    unknown: Option<VarId>,
}

impl ExplicitDiffusionTerm {
    pub fn new(coeff: impl Into<Coefficient>) -> Self {
        Self {
            inner: DiffusionTerm::new(coeff),
            unknown: None,
        }
    }
}

impl Term for ExplicitDiffusionTerm {
    fn name(&self) -> &str {
        "explicit diffusion"
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, unknown: VarId) -> TermResult<()> {
        self.unknown = Some(unknown);
        self.inner.bind(graph, unknown)
    }

    fn requires(&self) -> Vec<VarId> {
        self.inner.requires().into_iter().chain(self.unknown).collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        let mesh = ctx.mesh();
        let coeff = self.inner.face_view(ctx)?;
        let phi = ctx.unknown_field()?;
        let (id1, id2) = mesh.adjacent_cell_ids();

        for face in 0..mesh.face_count() {
            let (a, b) = (id1[face], id2[face]);
            for c in 0..ctx.nequ {
                let ra = sys.index(c, a);
                if a != b {
                    let flux = transmissibility(mesh, &coeff, c, face) * (phi.get(c, b) - phi.get(c, a));
                    let rb = sys.index(c, b);
                    sys.add_source(ra, flux);
                    sys.add_source(rb, -flux);
                    continue;
                }
                match ctx.faces.get(face) {
                    Some(FaceCondition::Value(g)) => {
                        let t = transmissibility(mesh, &coeff, c, face);
                        sys.add_source(ra, t * (g - phi.get(c, a)));
                    }
                    Some(FaceCondition::Flux(q)) => {
                        sys.add_source(ra, q * mesh.face_area(face));
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}
