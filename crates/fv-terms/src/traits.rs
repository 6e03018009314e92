//! Core traits for terms and parallel synchronization.

use std::fmt::Debug;

use fv_core::VarId;
use fv_vars::VarGraph;

use crate::assembly::{AssemblyContext, TermSystem};
use crate::error::TermResult;

/// One discretized operator of an equation.
///
/// Terms are configuration only: everything they read during assembly
/// comes from the context, and the same inputs always produce the same
/// contributions.
pub trait Term: Debug + Send + Sync {
    /// Term name for debugging and logging.
    fn name(&self) -> &str;

    /// Register the derived variables the term needs (old snapshots, face
    /// interpolations, Roe splits). Called once when the equation is built.
    fn bind(&mut self, _graph: &mut VarGraph<'_>, _unknown: VarId) -> TermResult<()> {
        Ok(())
    }

    /// Variables read by `contribute`; refreshed by the equation beforehand.
    fn requires(&self) -> Vec<VarId>;

    /// Add `M` and `s` of this term to the system.
    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()>;
}

impl<T: Term + ?Sized> Term for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn bind(&mut self, graph: &mut VarGraph<'_>, unknown: VarId) -> TermResult<()> {
        (**self).bind(graph, unknown)
    }

    fn requires(&self) -> Vec<VarId> {
        (**self).requires()
    }

    fn contribute(&self, ctx: &AssemblyContext<'_, '_>, sys: &mut TermSystem) -> TermResult<()> {
        (**self).contribute(ctx, sys)
    }
}

/// Import of ghost-cell values owned by other ranks.
///
/// Equations call `import` on their unknown before every assembly so that
/// matrix and residual evaluations see current neighbor data.
pub trait GhostExchange: Debug + Send + Sync {
    fn import(&self, graph: &mut VarGraph<'_>, unknown: VarId) -> TermResult<()>;
}

/// Serial run: nothing to exchange.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExchange;

impl GhostExchange for NoExchange {
    fn import(&self, _graph: &mut VarGraph<'_>, _unknown: VarId) -> TermResult<()> {
        Ok(())
    }
}
