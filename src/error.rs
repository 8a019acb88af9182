//! Error types for the FE engine

use thiserror::Error;

use crate::domain::DofKind;

/// Main error type for FE operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Uninitialized state: {0} requested before any state update")]
    UninitializedState(String),

    #[error("DOF {dof} does not exist at node {node:?}")]
    UnknownDof { node: Option<usize>, dof: DofKind },

    #[error("Node {0} not found in system")]
    UnknownNode(usize),

    #[error("Element {0} not found in system")]
    UnknownElement(usize),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Singular tangent stiffness - model may be unstable or have insufficient supports")]
    SingularSystem,

    #[error("No convergence after {iterations} iterations (residual norm {residual:.3e})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("State stack is empty: {0}")]
    StateStackEmpty(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for FE operations
pub type FEAResult<T> = Result<T, FEAError>;
