//! Solvers operating on an explicit [`System`]
//!
//! A solver never owns model state. It drives assembly, applies increments
//! and either leaves the system at a converged, committed state or rolls it
//! back to where the step started.

pub mod linear;
pub mod newton;
pub mod stability;

use serde::{Deserialize, Serialize};

use crate::analysis::{LinearSolve, SolverOptions};
use crate::domain::{Assembly, System, Tangent};
use crate::error::{FEAError, FEAResult};
use crate::math::{self, SparseMatrixBuilder, Vector};

pub use linear::LinearSolver;
pub use newton::NewtonRaphsonSolver;
pub use stability::{buckling_mode, check_stability, StabilityReport};

/// Outcome of one solve call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub converged: bool,
    /// Number of tangent solves performed
    pub iterations: usize,
    /// Residual norm at the accepted state
    pub residual_norm: f64,
    pub load_factor: f64,
    /// Residual norm at every assembly, in order
    pub history: Vec<f64>,
}

/// Solver interface
pub trait Solver {
    fn name(&self) -> &'static str;

    fn options(&self) -> &SolverOptions;

    /// Bring the system to equilibrium at its current load factor
    fn solve(&self, system: &mut System) -> FEAResult<SolveStats>;
}

/// Assemble in the storage the configured linear solver works on
pub(crate) fn assemble_for<'a>(
    system: &'a mut System,
    options: &SolverOptions,
) -> FEAResult<&'a Assembly> {
    match options.linear_solve {
        LinearSolve::ConjugateGradient => system.assemble_sparse(),
        LinearSolve::Lu | LinearSolve::Cholesky => system.assemble(),
    }
}

/// Solve `K·du = r` with the configured linear solver
pub(crate) fn solve_tangent(k: &Tangent, r: &Vector, options: &SolverOptions) -> FEAResult<Vector> {
    let du = match (options.linear_solve, k) {
        (LinearSolve::ConjugateGradient, Tangent::Sparse(builder)) => {
            math::solve_pcg(&builder.to_csr(), r, options.cg_tolerance, options.cg_max_iterations)
        }
        (LinearSolve::ConjugateGradient, Tangent::Dense(m)) => {
            let csr = SparseMatrixBuilder::from_dense(m).to_csr();
            math::solve_pcg(&csr, r, options.cg_tolerance, options.cg_max_iterations)
        }
        (LinearSolve::Lu, Tangent::Dense(m)) => math::solve_linear_system(m, r),
        (LinearSolve::Cholesky, Tangent::Dense(m)) => math::solve_cholesky(m, r),
        (LinearSolve::Lu, Tangent::Sparse(builder)) => {
            math::solve_linear_system(&builder.to_dense(), r)
        }
        (LinearSolve::Cholesky, Tangent::Sparse(builder)) => {
            math::solve_cholesky(&builder.to_dense(), r)
        }
    }
    .ok_or(FEAError::SingularSystem)?;

    if du.iter().any(|v| !v.is_finite()) {
        return Err(FEAError::SingularSystem);
    }
    Ok(du)
}

/// Norm of the displacements of all currently numbered (free) DOFs
pub(crate) fn free_displacement_norm(system: &System) -> f64 {
    system
        .nodes()
        .iter()
        .flat_map(|n| n.dofs())
        .filter(|d| d.index().is_some())
        .map(|d| d.value().powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Accept the current state: commit material history and record the step
pub(crate) fn accept_step(system: &mut System) -> FEAResult<()> {
    system.commit();
    if system.is_recording() {
        system.record_this_step()?;
    }
    Ok(())
}
