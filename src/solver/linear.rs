//! Single-solve linear analysis

use log::{info, warn};

use super::{accept_step, assemble_for, solve_tangent, SolveStats, Solver};
use crate::analysis::SolverOptions;
use crate::domain::System;
use crate::error::{FEAError, FEAResult};

/// One assembly and one solve of `K·du = R`
///
/// Exact only for models with a constant tangent; nonlinear materials or
/// finite kinematics give a first-order estimate. A failed solve leaves the
/// system as it was.
#[derive(Debug, Clone, Default)]
pub struct LinearSolver {
    options: SolverOptions,
}

impl LinearSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    fn run(&self, system: &mut System) -> FEAResult<SolveStats> {
        let assembly = assemble_for(system, &self.options)?;
        if assembly.size() == 0 {
            return Err(FEAError::AnalysisFailed(
                "No free degrees of freedom".to_string(),
            ));
        }
        let initial = assembly.residual().norm();
        let du = solve_tangent(assembly.tangent(), assembly.residual(), &self.options)?;
        system.apply_increment(&du)?;

        // refresh element forces at the solution for reactions and reports
        let residual_norm = assemble_for(system, &self.options)?.residual().norm();
        Ok(SolveStats {
            converged: true,
            iterations: 1,
            residual_norm,
            load_factor: system.load_factor(),
            history: vec![initial, residual_norm],
        })
    }
}

impl Solver for LinearSolver {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn options(&self) -> &SolverOptions {
        &self.options
    }

    fn solve(&self, system: &mut System) -> FEAResult<SolveStats> {
        system.push_state();
        match self.run(system) {
            Ok(stats) => {
                system.release_state()?;
                accept_step(system)?;
                info!(
                    "linear solve at λ = {}: residual {:.3e}",
                    stats.load_factor, stats.residual_norm
                );
                Ok(stats)
            }
            Err(err) => {
                warn!(
                    "linear solve at λ = {} failed: {}; rolling back",
                    system.load_factor(),
                    err
                );
                system.pop_state()?;
                Err(err)
            }
        }
    }
}
