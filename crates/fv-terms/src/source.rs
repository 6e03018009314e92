//! Source terms.

use fv_core::VarId;
use fv_mesh::Mesh;
use fv_vars::VarGraph;

use crate::assembly::{AssemblyContext, TermSystem};
use crate::coefficient::Coefficient;
use crate::error::TermResult;
use crate::traits::Term;

/// Explicit source `S`: `s_i += S V`.
#[derive(Debug, Clone)]
pub struct SourceTerm {
    coeff: Coefficient,
}

impl SourceTerm {
    pub fn new(coeff: impl Into<Coefficient>) -> Self {
        Self {
            coeff: coeff.into(),
        }
    }
}

impl Term for SourceTerm {
    fn name(&self) -> &str {
        "source"
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, _unknown: VarId) -> TermResult<()> {
        self.coeff.check_cells(graph, "source term")
    }

    fn requires(&self) -> Vec<VarId> {
        self.coeff.var().into_iter().collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        let coeff = self.coeff.view(ctx.graph, ctx.nequ)?;
        let volumes = ctx.mesh().cell_volumes();
        for c in 0..ctx.nequ {
            for (i, &vol) in volumes.iter().enumerate() {
                sys.add_source(sys.index(c, i), coeff.at(c, i) * vol);
            }
        }
        Ok(())
    }
}

/// Implicit source `S φ`: `M_ii += S V`.
///
/// The split form only keeps the coefficient implicit where it adds to the
/// diagonal of the final matrix (`S` positive on the left-hand side,
/// negative on the right-hand side); elsewhere `S V φ` is evaluated with the
/// current value and moved to the right-hand side.
#[derive(Debug, Clone)]
pub struct ImplicitSourceTerm {
    coeff: Coefficient,
    split: bool,
}

impl ImplicitSourceTerm {
    pub fn new(coeff: impl Into<Coefficient>) -> Self {
        Self {
            coeff: coeff.into(),
            split: false,
        }
    }

    pub fn split(coeff: impl Into<Coefficient>) -> Self {
        Self {
            coeff: coeff.into(),
            split: true,
        }
    }
}

impl Term for ImplicitSourceTerm {
    fn name(&self) -> &str {
        if self.split {
            "implicit source (split)"
        } else {
            "implicit source"
        }
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, _unknown: VarId) -> TermResult<()> {
        self.coeff.check_cells(graph, "implicit source term")
    }

    fn requires(&self) -> Vec<VarId> {
        self.coeff.var().into_iter().collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        let coeff = self.coeff.view(ctx.graph, ctx.nequ)?;
        let phi = ctx.unknown_field()?;
        let volumes = ctx.mesh().cell_volumes();
        for c in 0..ctx.nequ {
            for (i, &vol) in volumes.iter().enumerate() {
                let s = coeff.at(c, i) * vol;
                let row = sys.index(c, i);
                if !self.split || sys.sign() * s >= 0.0 {
                    sys.add_matrix(row, row, s);
                } else {
                    sys.add_source(row, s * phi.get(c, i));
                }
            }
        }
        Ok(())
    }
}
