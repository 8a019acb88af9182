//! Incremental-iterative Newton-Raphson solver with step cutting

use log::{debug, info, warn};

use super::{accept_step, assemble_for, free_displacement_norm, solve_tangent, SolveStats, Solver};
use crate::analysis::{ConvergenceCriterion, SolverOptions};
use crate::domain::System;
use crate::error::{FEAError, FEAResult};

/// Full Newton-Raphson with the tangent reassembled every iteration
///
/// Each step is bracketed by `push_state`: a converged step releases the
/// saved state and commits, a failed one pops it so the system is left
/// exactly as it was before the step.
#[derive(Debug, Clone, Default)]
pub struct NewtonRaphsonSolver {
    options: SolverOptions,
}

impl NewtonRaphsonSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Set the load factor to `load_factor` and solve; on failure the
    /// previous load factor is restored along with everything else
    pub fn step(&self, system: &mut System, load_factor: f64) -> FEAResult<SolveStats> {
        self.bracketed(system, Some(load_factor))
    }

    /// Advance the load factor to `target` in `steps` equal increments,
    /// halving the increment whenever a step fails to converge
    ///
    /// Returns the statistics of every accepted step.
    pub fn solve_to(
        &self,
        system: &mut System,
        target: f64,
        steps: usize,
    ) -> FEAResult<Vec<SolveStats>> {
        if steps == 0 {
            return Err(FEAError::InvalidInput("solve_to needs at least one step".to_string()));
        }
        let start = system.load_factor();
        let mut increment = (target - start) / steps as f64;
        let mut cuts = 0;
        let mut accepted = Vec::new();
        let eps = 1e-12 * target.abs().max(1.0);

        while (target - system.load_factor()).abs() > eps {
            let current = system.load_factor();
            let remaining = target - current;
            let next = if remaining.abs() <= increment.abs() + eps {
                target
            } else {
                current + increment
            };

            match self.step(system, next) {
                Ok(stats) => accepted.push(stats),
                Err(FEAError::NonConvergence { iterations, residual }) => {
                    if cuts >= self.options.max_cuts {
                        return Err(FEAError::NonConvergence { iterations, residual });
                    }
                    cuts += 1;
                    increment /= 2.0;
                    warn!(
                        "step to λ = {} failed, retrying with increment {} (cut {}/{})",
                        next, increment, cuts, self.options.max_cuts
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(accepted)
    }

    fn bracketed(&self, system: &mut System, target: Option<f64>) -> FEAResult<SolveStats> {
        system.push_state();
        if let Some(load_factor) = target {
            system.set_load_factor(load_factor);
        }

        match self.iterate(system) {
            Ok(stats) => {
                system.release_state()?;
                accept_step(system)?;
                info!(
                    "converged at λ = {} in {} iterations (residual {:.3e})",
                    stats.load_factor, stats.iterations, stats.residual_norm
                );
                Ok(stats)
            }
            Err(err) => {
                warn!("step at λ = {} rejected: {}; rolling back", system.load_factor(), err);
                system.pop_state()?;
                Err(err)
            }
        }
    }

    fn iterate(&self, system: &mut System) -> FEAResult<SolveStats> {
        let tol = self.options.tolerance;
        let mut history = Vec::new();
        let mut last_increment: Option<(f64, f64)> = None;

        for iteration in 0..=self.options.max_iterations {
            let assembly = assemble_for(system, &self.options)?;
            if assembly.size() == 0 {
                return Err(FEAError::AnalysisFailed(
                    "No free degrees of freedom".to_string(),
                ));
            }
            let residual = assembly.residual().norm();
            history.push(residual);
            // the first residual keeps the scale when free-DOF forces vanish
            // at equilibrium, as under prescribed displacements alone
            let reference = assembly
                .external()
                .norm()
                .max(assembly.internal().norm())
                .max(history[0]);

            let residual_ok = residual <= tol * reference;
            let displacement_ok = last_increment.is_some_and(|(du, u)| du <= tol * u);
            let converged = match self.options.criterion {
                ConvergenceCriterion::Residual => residual_ok,
                ConvergenceCriterion::Displacement => displacement_ok,
                ConvergenceCriterion::Both => residual_ok && displacement_ok,
            };
            if converged {
                return Ok(SolveStats {
                    converged: true,
                    iterations: iteration,
                    residual_norm: residual,
                    load_factor: system.load_factor(),
                    history,
                });
            }
            if iteration == self.options.max_iterations {
                return Err(FEAError::NonConvergence {
                    iterations: iteration,
                    residual,
                });
            }

            let du = solve_tangent(assembly.tangent(), assembly.residual(), &self.options)?;
            system.apply_increment(&du)?;
            let du_norm = du.norm();
            last_increment = Some((du_norm, free_displacement_norm(system)));
            debug!(
                "iteration {}: residual {:.3e}, increment {:.3e}",
                iteration + 1,
                residual,
                du_norm
            );
        }

        // the loop returns on its final pass
        Err(FEAError::NonConvergence {
            iterations: self.options.max_iterations,
            residual: history.last().copied().unwrap_or(f64::NAN),
        })
    }
}

impl Solver for NewtonRaphsonSolver {
    fn name(&self) -> &'static str {
        "newton-raphson"
    }

    fn options(&self) -> &SolverOptions {
        &self.options
    }

    fn solve(&self, system: &mut System) -> FEAResult<SolveStats> {
        self.bracketed(system, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DofKind, Node, NodeId, Probe};
    use crate::elements::{Truss, TrussConfig};
    use crate::materials::{Elastic, Fiber, FiberParams};
    use approx::assert_relative_eq;

    /// Horizontal bar fixed at the origin with a free x-DOF at the tip
    fn bar(material: Box<dyn crate::materials::Material>) -> (System, NodeId) {
        let mut system = System::new();
        let a = system.add_node(Node::new(0.0, 0.0));
        let b = system.add_node(Node::new(1.0, 0.0));
        system
            .add_element(Truss::new(a, b, material, TrussConfig::default()).unwrap())
            .unwrap();
        system.node_mut(a).unwrap().fix_dof(&[DofKind::Ux, DofKind::Uy]).unwrap();
        system.node_mut(b).unwrap().fix_dof(&[DofKind::Uy]).unwrap();
        system.node_mut(b).unwrap().set_load(&[1.0], &[DofKind::Ux]).unwrap();
        (system, b)
    }

    #[test]
    fn test_zero_load_converges_immediately() {
        let (mut system, _) = bar(Box::new(Elastic::with_modulus(10.0)));
        let stats = NewtonRaphsonSolver::default().solve(&mut system).unwrap();
        assert_eq!(stats.iterations, 0);
        assert_eq!(system.stack_depth(), 0);
    }

    #[test]
    fn test_hardening_bar_with_recorder() {
        let fiber = Fiber::new(FiberParams {
            e: 100.0,
            fy: 1.0,
            hardening: 10.0,
            ..FiberParams::default()
        })
        .unwrap();
        let (mut system, tip) = bar(Box::new(fiber));
        let probe = Probe::Displacement {
            node: tip,
            dof: DofKind::Ux,
        };
        system.start_recorder(vec![Probe::LoadFactor, probe]);

        let solver = NewtonRaphsonSolver::new(SolverOptions::default().with_max_iter(20));
        let steps = solver.solve_to(&mut system, 2.0, 4).unwrap();
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|s| s.converged));

        // yield at ε = 0.01, then E_t = 100·10/110
        let u = system.node(tip).unwrap().dof(DofKind::Ux).unwrap().value();
        assert_relative_eq!(u, 0.01 + 1.0 / (1000.0 / 110.0), epsilon = 1e-9);
        assert_eq!(system.fetch_record(&Probe::LoadFactor).unwrap(), vec![0.5, 1.0, 1.5, 2.0]);
        assert_eq!(system.fetch_record(&probe).unwrap().len(), 4);
        assert_eq!(system.stack_depth(), 0);
    }

    #[test]
    fn test_failed_step_restores_load_factor() {
        let (mut system, _) = bar(Box::new(Elastic::with_modulus(10.0)));
        let solver = NewtonRaphsonSolver::new(SolverOptions::default().with_max_iter(0));
        let err = solver.step(&mut system, 3.0).unwrap_err();
        assert!(matches!(err, FEAError::NonConvergence { iterations: 0, .. }));
        assert_eq!(system.load_factor(), 0.0);
        assert_eq!(system.stack_depth(), 0);
    }

    #[test]
    fn test_solve_to_rejects_zero_steps() {
        let (mut system, _) = bar(Box::new(Elastic::with_modulus(10.0)));
        assert!(NewtonRaphsonSolver::default().solve_to(&mut system, 1.0, 0).is_err());
    }
}
