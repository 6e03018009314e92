//! Equations: signed sums of terms with boundary conditions and a solver.

use fv_core::{Real, VarId, ensure_all_finite};
use fv_solver::{
    CsrMatrixExt, Gmres, LinearSolver, LinearSystem, NewtonConfig, NonlinearProblem,
    ResidualFailure, SolverError, SolverResult, finite_difference_jacobian, newton_solve,
};
use fv_vars::{Location, VarError, VarGraph};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::assembly::{AssemblyContext, TermSystem};
use crate::boundary::{BoundaryCondition, BoundaryConditions, Constraint};
use crate::error::{TermError, TermResult};
use crate::traits::{GhostExchange, NoExchange, Term};

/// Outcome of one linear solve of an equation.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// `|A x - b|` at the value the solve started from.
    pub residual_norm: Real,
    pub iterations: usize,
    pub solver: &'static str,
}

/// Outcome of a Newton solve of an equation.
#[derive(Clone, Debug, PartialEq)]
pub struct NonlinearReport {
    pub residual_norm: Real,
    pub iterations: usize,
}

/// Jacobian used by Newton iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JacobianMode {
    /// Forward differences of the assembled residual.
    #[default]
    FiniteDifference,
    /// The assembled matrix at the current iterate (Picard linearization).
    Assembled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NonlinearOptions {
    pub newton: NewtonConfig,
    pub jacobian: JacobianMode,
}

/// `Σ lhs terms == Σ rhs terms` for one unknown.
///
/// Built once, then assembled and solved as often as needed. Assembly reads
/// the variable graph and never writes it, except for the ghost exchange
/// that precedes it; a solve writes the unknown only after the solver
/// accepted a finite result.
#[derive(Debug)]
pub struct Equation {
    name: String,
    unknown: VarId,
    nequ: usize,
    terms: Vec<(Real, Box<dyn Term>)>,
    boundary: BoundaryConditions,
    constraints: Vec<Constraint>,
    solver: Box<dyn LinearSolver>,
    exchange: Box<dyn GhostExchange>,
    requires: Vec<VarId>,
}

/// Builder for [`Equation`].
///
/// Terms added before [`equals`](EquationBuilder::equals) belong to the
/// left-hand side, later ones to the right-hand side.
#[derive(Debug)]
pub struct EquationBuilder {
    name: String,
    unknown: VarId,
    rhs: bool,
    terms: Vec<(Real, Box<dyn Term>)>,
    boundary: BoundaryConditions,
    constraints: Vec<Constraint>,
    solver: Option<Box<dyn LinearSolver>>,
    exchange: Option<Box<dyn GhostExchange>>,
}

impl EquationBuilder {
    fn push(mut self, sign: Real, term: Box<dyn Term>) -> Self {
        let side = if self.rhs { -1.0 } else { 1.0 };
        self.terms.push((side * sign, term));
        self
    }

    pub fn add(self, term: impl Term + 'static) -> Self {
        self.push(1.0, Box::new(term))
    }

    pub fn sub(self, term: impl Term + 'static) -> Self {
        self.push(-1.0, Box::new(term))
    }

    /// Switch to the right-hand side.
    pub fn equals(mut self) -> Self {
        self.rhs = true;
        self
    }

    pub fn boundary(mut self, bc: BoundaryCondition) -> Self {
        self.boundary.push(bc);
        self
    }

    /// Pin the listed cells to `value` by row replacement.
    pub fn constrain(mut self, cells: impl IntoIterator<Item = usize>, value: Real) -> Self {
        self.constraints.push(Constraint {
            cells: cells.into_iter().collect(),
            value,
        });
        self
    }

    pub fn solver(mut self, solver: impl LinearSolver + 'static) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }

    pub fn exchange(mut self, exchange: impl GhostExchange + 'static) -> Self {
        self.exchange = Some(Box::new(exchange));
        self
    }

    /// Validate the setup and bind every term to the graph.
    pub fn build(self, graph: &mut VarGraph<'_>) -> TermResult<Equation> {
        let unknown = self.unknown;
        if graph.is_derived(unknown)? {
            return Err(VarError::Derived {
                name: graph.name(unknown)?.to_string(),
            }
            .into());
        }
        if graph.location(unknown)? != Location::Cell {
            return Err(TermError::invalid(format!(
                "unknown '{}' of equation '{}' must live on cells",
                graph.name(unknown)?,
                self.name
            )));
        }
        if self.terms.is_empty() {
            return Err(TermError::invalid(format!(
                "equation '{}' has no terms",
                self.name
            )));
        }

        let mesh = graph.mesh();
        self.boundary.resolve(mesh)?;
        let len = mesh.cell_count();
        let mut owner: Vec<Option<usize>> = vec![None; len];
        for (k, constraint) in self.constraints.iter().enumerate() {
            if let Some(&cell) = constraint.cells.iter().find(|&&c| c >= len) {
                return Err(TermError::CellOutOfRange { cell, len });
            }
            for &cell in &constraint.cells {
                match owner[cell] {
                    Some(first) if first != k => {
                        let mut cells: Vec<usize> = constraint
                            .cells
                            .iter()
                            .copied()
                            .filter(|c| self.constraints[first].cells.contains(c))
                            .collect();
                        cells.sort_unstable();
                        cells.dedup();
                        return Err(TermError::ConflictingConstraint {
                            first,
                            second: k,
                            cells,
                        });
                    }
                    _ => owner[cell] = Some(k),
                }
            }
        }

        let mut terms = self.terms;
        for (_, term) in terms.iter_mut() {
            term.bind(graph, unknown)?;
        }

        let mut requires = vec![unknown];
        for id in terms.iter().flat_map(|(_, t)| t.requires()) {
            if !requires.contains(&id) {
                requires.push(id);
            }
        }

        Ok(Equation {
            name: self.name,
            unknown,
            nequ: graph.components(unknown)?,
            terms,
            boundary: self.boundary,
            constraints: self.constraints,
            solver: self.solver.unwrap_or_else(|| Box::new(Gmres::default())),
            exchange: self.exchange.unwrap_or_else(|| Box::new(NoExchange)),
            requires,
        })
    }
}

impl Equation {
    pub fn builder(name: impl Into<String>, unknown: VarId) -> EquationBuilder {
        EquationBuilder {
            name: name.into(),
            unknown,
            rhs: false,
            terms: Vec::new(),
            boundary: BoundaryConditions::new(),
            constraints: Vec::new(),
            solver: None,
            exchange: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unknown(&self) -> VarId {
        self.unknown
    }

    pub fn boundary(&self) -> &BoundaryConditions {
        &self.boundary
    }

    /// Term names with their signs (+1 left, -1 right or subtracted).
    pub fn terms(&self) -> impl Iterator<Item = (Real, &str)> {
        self.terms.iter().map(|(s, t)| (*s, t.name()))
    }

    /// Every variable read during assembly, the unknown first.
    pub fn requires(&self) -> &[VarId] {
        &self.requires
    }

    /// Assemble `A x = b` at the current state of the graph.
    pub fn prepare(&self, graph: &mut VarGraph<'_>, dt: Real) -> TermResult<LinearSystem> {
        self.exchange.import(graph, self.unknown)?;
        let faces = self.boundary.resolve(graph.mesh())?;
        graph.refresh_all(&self.requires)?;

        let graph: &VarGraph<'_> = graph;
        let cells = graph.mesh().cell_count();
        let ctx = AssemblyContext {
            graph,
            unknown: self.unknown,
            nequ: self.nequ,
            dt,
            faces: &faces,
        };

        let mut sys = TermSystem::new(cells, self.nequ);
        for (sign, term) in &self.terms {
            sys.set_sign(*sign);
            term.contribute(&ctx, &mut sys)?;
        }

        sys.set_sign(1.0);
        for constraint in &self.constraints {
            let rows: Vec<usize> = (0..self.nequ)
                .flat_map(|c| constraint.cells.iter().map(move |&i| c * cells + i))
                .collect();
            sys.constrain(&rows, constraint.value);
        }

        let system = sys.finish()?;
        debug!(
            equation = %self.name,
            rows = system.len(),
            nnz = system.matrix.nnz(),
            "assembled"
        );
        Ok(system)
    }

    fn current(&self, graph: &mut VarGraph<'_>) -> TermResult<DVector<Real>> {
        Ok(DVector::from_column_slice(graph.value(self.unknown)?.data()))
    }

    /// `A x - b` at the current value of the unknown.
    pub fn residual(&self, graph: &mut VarGraph<'_>, dt: Real) -> TermResult<DVector<Real>> {
        let system = self.prepare(graph, dt)?;
        let x = self.current(graph)?;
        Ok(system.residual(&x))
    }

    /// Assemble, solve once and write the result back. The report carries
    /// the residual norm before the update.
    pub fn sweep(&self, graph: &mut VarGraph<'_>, dt: Real) -> TermResult<SolveReport> {
        let system = self.prepare(graph, dt)?;
        let x0 = self.current(graph)?;
        let residual_norm = system.residual(&x0).norm();

        let solution = self.solver.solve(&system, &x0).inspect_err(|e| {
            warn!(equation = %self.name, solver = self.solver.name(), error = %e, "linear solve failed");
        })?;
        ensure_all_finite(solution.x.as_slice(), "solution").map_err(|_| TermError::NonFinite {
            what: format!("solution of '{}'", self.name),
        })?;
        graph.set_value(self.unknown, solution.x.as_slice().to_vec())?;

        debug!(
            equation = %self.name,
            residual = residual_norm,
            iterations = solution.iterations,
            "solved"
        );
        Ok(SolveReport {
            residual_norm,
            iterations: solution.iterations,
            solver: self.solver.name(),
        })
    }

    pub fn solve(&self, graph: &mut VarGraph<'_>, dt: Real) -> TermResult<()> {
        self.sweep(graph, dt).map(|_| ())
    }

    /// Newton iteration on the assembled residual `A(x) x - b(x)`.
    ///
    /// On failure the unknown is restored to the value it had on entry.
    pub fn solve_nonlinear(
        &self,
        graph: &mut VarGraph<'_>,
        dt: Real,
        options: &NonlinearOptions,
    ) -> TermResult<NonlinearReport> {
        let start = graph.value(self.unknown)?.data().to_vec();

        let (result, error) = {
            let mut problem = EquationProblem {
                equation: self,
                graph: &mut *graph,
                dt,
                mode: options.jacobian,
                error: None,
            };
            let result = newton_solve(&mut problem, DVector::from_vec(start.clone()), &options.newton);
            (result, problem.error)
        };

        match result {
            Ok(newton) => {
                graph.set_value(self.unknown, newton.x.as_slice().to_vec())?;
                Ok(NonlinearReport {
                    residual_norm: newton.residual_norm,
                    iterations: newton.iterations,
                })
            }
            Err(e) => {
                graph.set_value(self.unknown, start)?;
                warn!(equation = %self.name, error = %e, "nonlinear solve failed");
                Err(error.unwrap_or(TermError::Solver(e)))
            }
        }
    }
}

/// Newton view of an equation: the unknown is written to the graph before
/// every residual evaluation.
struct EquationProblem<'e, 'g, 'm> {
    equation: &'e Equation,
    graph: &'g mut VarGraph<'m>,
    dt: Real,
    mode: JacobianMode,
    /// First assembly error, reported instead of the generic abort.
    error: Option<TermError>,
}

impl EquationProblem<'_, '_, '_> {
    fn assemble(&mut self, x: &DVector<Real>) -> TermResult<LinearSystem> {
        self.graph
            .set_value(self.equation.unknown, x.as_slice().to_vec())?;
        self.equation.prepare(self.graph, self.dt)
    }

    fn record(&mut self, e: TermError) -> String {
        let what = e.to_string();
        self.error.get_or_insert(e);
        what
    }
}

impl NonlinearProblem for EquationProblem<'_, '_, '_> {
    fn residual(&mut self, x: &DVector<Real>) -> Result<DVector<Real>, ResidualFailure> {
        match self.assemble(x) {
            Ok(system) => Ok(system.residual(x)),
            Err(e) => Err(ResidualFailure::Fatal {
                what: self.record(e),
            }),
        }
    }

    fn jacobian(
        &mut self,
        x: &DVector<Real>,
        f_x: &DVector<Real>,
        epsilon: Real,
    ) -> SolverResult<DMatrix<Real>> {
        match self.mode {
            JacobianMode::FiniteDifference => finite_difference_jacobian(self, x, f_x, epsilon),
            JacobianMode::Assembled => match self.assemble(x) {
                Ok(system) => Ok(system.matrix.to_dense()),
                Err(e) => Err(SolverError::Fatal {
                    what: self.record(e),
                }),
            },
        }
    }
}
