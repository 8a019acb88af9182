//! Model domain: DOFs, nodes, the system that owns them, and recording

pub mod dof;
pub mod node;
pub mod recorder;
pub mod system;
pub mod transformation;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use dof::{DegreeOfFreedom, DofHandle, DofKind};
pub use node::Node;
pub use recorder::{Probe, RecordedStep, Recorder};
pub use system::{Assembly, System, SystemSnapshot, Tangent};
pub use transformation::Transformation;

/// Stable index of a node inside its system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Stable index of an element inside its system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}
