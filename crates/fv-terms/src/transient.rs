//! Implicit Euler time derivative.

use fv_core::VarId;
use fv_mesh::Mesh;
use fv_vars::VarGraph;

use crate::assembly::{AssemblyContext, TermSystem};
use crate::coefficient::Coefficient;
use crate::error::{TermError, TermResult};
use crate::traits::Term;

/// `∂(c φ)/∂t` integrated over each cell:
/// `M_ii += c V / dt`, `s_i -= c V / dt φ_old`.
///
/// With `c == 0` the term contributes nothing, which turns a transient
/// equation into a steady one.
#[derive(Debug, Clone)]
pub struct TransientTerm {
    coeff: Coefficient,
    old: Option<VarId>,
}

impl TransientTerm {
    pub fn new(coeff: impl Into<Coefficient>) -> Self {
        Self {
            coeff: coeff.into(),
            old: None,
        }
    }
}

impl Default for TransientTerm {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Term for TransientTerm {
    fn name(&self) -> &str {
        "transient"
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, unknown: VarId) -> TermResult<()> {
        self.coeff.check_cells(graph, "transient term")?;
        self.old = Some(graph.old(unknown)?);
        Ok(())
    }

    fn requires(&self) -> Vec<VarId> {
        self.coeff.var().into_iter().chain(self.old).collect()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        if self.coeff.is_zero() {
            return Ok(());
        }
        if !(ctx.dt > 0.0 && ctx.dt.is_finite()) {
            return Err(TermError::invalid(format!(
                "time step {} for a transient term",
                ctx.dt
            )));
        }
        let old = self
            .old
            .ok_or_else(|| TermError::invalid("transient term used before binding"))?;
        let old = ctx.graph.field(old)?;
        let coeff = self.coeff.view(ctx.graph, ctx.nequ)?;
        let volumes = ctx.mesh().cell_volumes();

        for c in 0..ctx.nequ {
            for (i, &vol) in volumes.iter().enumerate() {
                let a = coeff.at(c, i) * vol / ctx.dt;
                let row = sys.index(c, i);
                sys.add_matrix(row, row, a);
                sys.add_source(row, -a * old.get(c, i));
            }
        }
        Ok(())
    }
}
