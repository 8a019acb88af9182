//! FEA Engine - nonlinear finite element assembly and solve
//!
//! A small structural analysis core built around an explicit [`System`]
//! that owns nodes and elements, supporting:
//! - Truss, beam, frame and constant-strain triangle elements
//! - Elastic, elastic-plastic fiber, plane stress/strain and layered section materials
//! - Optional finite (large displacement) kinematics
//! - Linear and Newton-Raphson solvers with state rollback and step cutting
//! - Stability checks and buckling modes from the tangent stiffness
//!
//! [`System`]: domain::System
//!
//! ## Example
//! ```rust
//! use fea_engine::prelude::*;
//!
//! let mut system = System::new();
//! let a = system.add_node(Node::new(0.0, 0.0));
//! let b = system.add_node(Node::new(2.0, 0.0));
//!
//! let material = Box::new(Elastic::with_modulus(100.0));
//! let bar = Truss::new(a, b, material, TrussConfig::default()).unwrap();
//! system.add_element(bar).unwrap();
//!
//! system.node_mut(a).unwrap().fix_dof(&[DofKind::Ux, DofKind::Uy]).unwrap();
//! system.node_mut(b).unwrap().fix_dof(&[DofKind::Uy]).unwrap();
//! system.node_mut(b).unwrap().set_load(&[10.0], &[DofKind::Ux]).unwrap();
//!
//! let solver = NewtonRaphsonSolver::default();
//! solver.step(&mut system, 1.0).unwrap();
//!
//! let u = system.node(b).unwrap().dof(DofKind::Ux).unwrap().value();
//! assert!((u - 0.2).abs() < 1e-12);
//! ```

pub mod analysis;
pub mod domain;
pub mod elements;
pub mod error;
pub mod materials;
pub mod math;
pub mod options;
pub mod results;
pub mod solver;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{ConvergenceCriterion, LinearSolve, SolverOptions};
    pub use crate::domain::{
        DofHandle, DofKind, ElementId, Node, NodeId, Probe, System, Transformation,
    };
    pub use crate::elements::{
        Beam2D, BeamConfig, Element, ElementLoad, Frame2D, FrameConfig, Kinematics,
        LinearTriangle, TriangleConfig, Truss, TrussConfig,
    };
    pub use crate::error::{FEAError, FEAResult};
    pub use crate::materials::{
        Elastic, ElasticParams, Fiber, FiberParams, Material, PlaneParams, PlaneStrain,
        PlaneStress, SectionMaterial, SectionParams,
    };
    pub use crate::options::from_options;
    pub use crate::results::{InternalForces, NodeReport, SystemReport};
    pub use crate::solver::{
        buckling_mode, check_stability, LinearSolver, NewtonRaphsonSolver, SolveStats, Solver,
        StabilityReport,
    };
}
