//! Solver configuration

use serde::{Deserialize, Serialize};

/// Quantity checked against the tolerance after each Newton iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceCriterion {
    /// ‖R‖ relative to the larger of ‖F_ext‖ and ‖F_int‖
    #[default]
    Residual,
    /// ‖Δu‖ relative to ‖u‖ over the free DOFs
    Displacement,
    /// Both of the above
    Both,
}

/// Linear equation solver used for every tangent solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolve {
    /// Dense LU decomposition
    #[default]
    Lu,
    /// Dense Cholesky, requires a positive definite tangent
    Cholesky,
    /// Jacobi-preconditioned conjugate gradient on a sparse copy
    ConjugateGradient,
}

/// Options for the linear and Newton-Raphson solvers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    /// Iteration budget per load step
    pub max_iterations: usize,
    /// Relative convergence tolerance
    pub tolerance: f64,
    pub criterion: ConvergenceCriterion,
    pub linear_solve: LinearSolve,
    /// Relative residual target of the conjugate gradient solve
    pub cg_tolerance: f64,
    pub cg_max_iterations: usize,
    /// Maximum number of step halvings in
    /// [`solve_to`](crate::solver::NewtonRaphsonSolver::solve_to)
    pub max_cuts: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-10,
            criterion: ConvergenceCriterion::Residual,
            linear_solve: LinearSolve::Lu,
            cg_tolerance: 1e-12,
            cg_max_iterations: 10_000,
            max_cuts: 4,
        }
    }
}

impl SolverOptions {
    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_criterion(mut self, criterion: ConvergenceCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_linear_solve(mut self, linear_solve: LinearSolve) -> Self {
        self.linear_solve = linear_solve;
        self
    }

    /// Set the number of allowed step halvings
    pub fn with_max_cuts(mut self, max_cuts: usize) -> Self {
        self.max_cuts = max_cuts;
        self
    }
}
