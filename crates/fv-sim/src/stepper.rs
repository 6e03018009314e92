//! Fixed-step time iteration.

use fv_core::{Real, VarId};
use fv_terms::{Equation, NonlinearOptions};
use fv_vars::VarGraph;
use tracing::{debug, info_span, warn};

use crate::error::{SimError, SimResult};

/// How each equation is solved within a step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveMode {
    /// One assemble + linear solve per equation.
    #[default]
    Linear,
    /// Newton iteration on each equation's residual.
    Nonlinear(NonlinearOptions),
}

/// Options for time stepping.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepperOptions {
    /// Fixed time step (seconds)
    pub dt: Real,
    pub mode: SolveMode,
}

impl Default for StepperOptions {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            mode: SolveMode::default(),
        }
    }
}

/// Summary of a `timestep` call.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Steps taken by this call
    pub steps: usize,
    /// Simulation time after the last step
    pub time: Real,
    /// Residual norm per equation in the last step, before its update
    pub residuals: Vec<Real>,
}

/// Values of the unknowns and their old snapshots at the start of a step.
struct StepState {
    saved: Vec<(VarId, Vec<Real>)>,
}

impl StepState {
    fn capture(graph: &mut VarGraph<'_>, equations: &[Equation]) -> SimResult<Self> {
        let mut saved: Vec<(VarId, Vec<Real>)> = Vec::new();
        for eq in equations {
            let unknown = eq.unknown();
            let ids = std::iter::once(unknown).chain(graph.old_of(unknown));
            for id in ids {
                if saved.iter().all(|(seen, _)| *seen != id) {
                    let values = graph.value(id)?.data().to_vec();
                    saved.push((id, values));
                }
            }
        }
        Ok(Self { saved })
    }

    fn restore(self, graph: &mut VarGraph<'_>) -> SimResult<()> {
        for (id, values) in self.saved {
            graph.set_value(id, values)?;
        }
        Ok(())
    }
}

/// Advances a set of equations in time.
#[derive(Debug)]
pub struct TimeStepper {
    equations: Vec<Equation>,
    options: StepperOptions,
    step: u64,
}

impl TimeStepper {
    pub fn new(equations: Vec<Equation>, options: StepperOptions) -> SimResult<Self> {
        if !(options.dt > 0.0 && options.dt.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive and finite",
            });
        }
        if equations.is_empty() {
            return Err(SimError::InvalidArg {
                what: "at least one equation is required",
            });
        }
        Ok(Self {
            equations,
            options,
            step: 0,
        })
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn options(&self) -> &StepperOptions {
        &self.options
    }

    /// Completed steps.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn time(&self) -> Real {
        self.step as Real * self.options.dt
    }

    /// Take `n` steps.
    ///
    /// Each step copies the current value of every unknown with an old
    /// snapshot into it, then solves the equations in order. A failure
    /// aborts the call and rolls the unknowns and their old snapshots back
    /// to the start of the failed step, which is not counted.
    pub fn timestep(&mut self, graph: &mut VarGraph<'_>, n: usize) -> SimResult<StepReport> {
        let dt = self.options.dt;
        let mut residuals = Vec::with_capacity(self.equations.len());

        for _ in 0..n {
            let step = self.step + 1;
            let span = info_span!("timestep", step, time = step as Real * dt);
            let _guard = span.enter();

            let state = StepState::capture(graph, &self.equations)?;
            if let Err(e) = self.advance(graph, step, &mut residuals) {
                state.restore(graph)?;
                return Err(e);
            }
            self.step = step;
        }

        Ok(StepReport {
            steps: n,
            time: self.time(),
            residuals,
        })
    }

    fn advance(
        &self,
        graph: &mut VarGraph<'_>,
        step: u64,
        residuals: &mut Vec<Real>,
    ) -> SimResult<()> {
        let dt = self.options.dt;
        for eq in &self.equations {
            graph.update_old(eq.unknown())?;
        }

        residuals.clear();
        for eq in &self.equations {
            let solved = match &self.options.mode {
                SolveMode::Linear => eq.sweep(graph, dt).map(|r| r.residual_norm),
                SolveMode::Nonlinear(options) => eq
                    .solve_nonlinear(graph, dt, options)
                    .map(|r| r.residual_norm),
            };
            let residual = solved.map_err(|source| {
                warn!(equation = eq.name(), error = %source, "step failed, rolling back");
                SimError::Equation {
                    equation: eq.name().to_string(),
                    step,
                    source,
                }
            })?;
            debug!(equation = eq.name(), residual);
            residuals.push(residual);
        }
        Ok(())
    }
}
