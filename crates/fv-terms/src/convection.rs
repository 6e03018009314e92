//! Convection terms.

use fv_core::{Real, VarId};
use fv_mesh::Mesh;
use fv_vars::VarGraph;

use crate::assembly::{AssemblyContext, TermSystem};
use crate::boundary::FaceCondition;
use crate::coefficient::Velocity;
use crate::error::{TermError, TermResult};
use crate::traits::Term;

/// Face value reconstruction of a convection term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConvectionScheme {
    /// Value of the cell the face flux leaves.
    Upwind,
    /// Distance-weighted average of both cells.
    Central,
    /// Roe flux splitting of a coupled system. `coeff` is a cell variable
    /// of shape `[dim, nequ, nequ]` (or `[nequ, nequ]`).
    Roe { coeff: VarId },
}

/// `∇·(u φ)` integrated over each cell.
///
/// On the boundary a fixed value is used as the inflow value (outflow takes
/// the cell value); faces without a fixed value carry no convective flux.
#[derive(Debug, Clone)]
pub struct ConvectionTerm {
    scheme: ConvectionScheme,
    velocity: Option<Velocity>,
    roe: Option<VarId>,
}

impl ConvectionTerm {
    pub fn upwind(velocity: impl Into<Velocity>) -> Self {
        Self {
            scheme: ConvectionScheme::Upwind,
            velocity: Some(velocity.into()),
            roe: None,
        }
    }

    pub fn central(velocity: impl Into<Velocity>) -> Self {
        Self {
            scheme: ConvectionScheme::Central,
            velocity: Some(velocity.into()),
            roe: None,
        }
    }

    pub fn roe(coeff: VarId) -> Self {
        Self {
            scheme: ConvectionScheme::Roe { coeff },
            velocity: None,
            roe: None,
        }
    }

    pub fn scheme(&self) -> ConvectionScheme {
        self.scheme
    }

    fn scalar_flux(
        &self,
        ctx: &AssemblyContext<'_, '_>,
        sys: &mut TermSystem,
        velocity: &Velocity,
    ) -> TermResult<()> {
        let mesh = ctx.mesh();
        let fluxes = velocity.face_fluxes(ctx.graph)?;
        let (id1, id2) = mesh.adjacent_cell_ids();

        for (face, &flux) in fluxes.iter().enumerate() {
            let (a, b) = (id1[face], id2[face]);
            for c in 0..ctx.nequ {
                let ra = sys.index(c, a);
                if a == b {
                    match ctx.faces.get(face) {
                        Some(FaceCondition::Value(g)) if flux < 0.0 => {
                            sys.add_source(ra, flux * g);
                        }
                        Some(FaceCondition::Value(_)) => sys.add_matrix(ra, ra, flux),
                        Some(FaceCondition::Flux(_)) | None => {}
                    }
                    continue;
                }
                // weight of the id1 value in the face value
                let w = match self.scheme {
                    ConvectionScheme::Upwind => {
                        if flux >= 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    _ => mesh.interpolation_weight(face),
                };
                let rb = sys.index(c, b);
                sys.add_matrix(ra, ra, flux * w);
                sys.add_matrix(ra, rb, flux * (1.0 - w));
                sys.add_matrix(rb, ra, -flux * w);
                sys.add_matrix(rb, rb, -flux * (1.0 - w));
            }
        }
        Ok(())
    }

    fn roe_flux(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem, split: VarId) -> TermResult<()> {
        let mesh = ctx.mesh();
        let blocks = ctx.graph.field(split)?;
        let nequ = ctx.nequ;
        let block = nequ * nequ;
        let (id1, id2) = mesh.adjacent_cell_ids();

        // (r, c) entry of slot `s` on `face`
        let at = |s: usize, r: usize, c: usize, face: usize| -> Real {
            blocks.get(s * block + r * nequ + c, face)
        };

        for face in 0..mesh.face_count() {
            let (a, b) = (id1[face], id2[face]);
            if a == b {
                let Some(g) = ctx.faces.fixed_value(face) else {
                    continue;
                };
                for r in 0..nequ {
                    let row = sys.index(r, a);
                    for c in 0..nequ {
                        sys.add_matrix(row, sys.index(c, a), at(0, r, c, face));
                        sys.add_source(row, at(1, r, c, face) * g);
                    }
                }
                continue;
            }
            for r in 0..nequ {
                let ra = sys.index(r, a);
                let rb = sys.index(r, b);
                for c in 0..nequ {
                    let (ca, cb) = (sys.index(c, a), sys.index(c, b));
                    let (s0, s1) = (at(0, r, c, face), at(1, r, c, face));
                    sys.add_matrix(ra, ca, s0);
                    sys.add_matrix(ra, cb, s1);
                    sys.add_matrix(rb, ca, -s0);
                    sys.add_matrix(rb, cb, -s1);
                }
            }
        }
        Ok(())
    }
}

impl Term for ConvectionTerm {
    fn name(&self) -> &str {
        match self.scheme {
            ConvectionScheme::Upwind => "convection (upwind)",
            ConvectionScheme::Central => "convection (central)",
            ConvectionScheme::Roe { .. } => "convection (roe)",
        }
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, unknown: VarId) -> TermResult<()> {
        match self.scheme {
            ConvectionScheme::Roe { coeff } => {
                self.roe = Some(graph.roe(unknown, coeff)?);
            }
            ConvectionScheme::Upwind | ConvectionScheme::Central => {
                if let Some(v) = self.velocity {
                    self.velocity = Some(v.on_faces(graph)?);
                }
            }
        }
        Ok(())
    }

    fn requires(&self) -> Vec<VarId> {
        self.velocity
            .and_then(|v| v.var())
            .into_iter()
            .chain(self.roe)
            .collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        match (self.scheme, self.velocity, self.roe) {
            (ConvectionScheme::Roe { .. }, _, Some(split)) => self.roe_flux(ctx, sys, split),
            (ConvectionScheme::Upwind | ConvectionScheme::Central, Some(v), _) => {
                if let Some(id) = v.var() {
                    if ctx.graph.location(id)? != fv_vars::Location::Face {
                        return Err(TermError::invalid("convection velocity used before binding"));
                    }
                }
                self.scalar_flux(ctx, sys, &v)
            }
            _ => Err(TermError::invalid("convection term used before binding")),
        }
    }
}
