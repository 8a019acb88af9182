//! Degrees of freedom

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NodeId;

/// Identifier of a nodal degree of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DofKind {
    /// Displacement in x-direction
    Ux,
    /// Displacement in y-direction
    Uy,
    /// Displacement in z-direction
    Uz,
    /// Rotation about x-axis
    Rx,
    /// Rotation about y-axis
    Ry,
    /// Rotation about z-axis
    Rz,
}

impl DofKind {
    /// Spatial axis (0, 1, 2) this DOF acts along or about
    pub fn axis(self) -> usize {
        match self {
            DofKind::Ux | DofKind::Rx => 0,
            DofKind::Uy | DofKind::Ry => 1,
            DofKind::Uz | DofKind::Rz => 2,
        }
    }

    /// True for ux, uy, uz
    pub fn is_translation(self) -> bool {
        matches!(self, DofKind::Ux | DofKind::Uy | DofKind::Uz)
    }

    /// Translational DOF along the given axis
    pub fn translation(axis: usize) -> Option<DofKind> {
        match axis {
            0 => Some(DofKind::Ux),
            1 => Some(DofKind::Uy),
            2 => Some(DofKind::Uz),
            _ => None,
        }
    }
}

impl fmt::Display for DofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            DofKind::Ux => "ux",
            DofKind::Uy => "uy",
            DofKind::Uz => "uz",
            DofKind::Rx => "rx",
            DofKind::Ry => "ry",
            DofKind::Rz => "rz",
        };
        f.write_str(code)
    }
}

/// Handle to one DOF in the system: the owning node plus the DOF kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DofHandle {
    pub node: NodeId,
    pub kind: DofKind,
}

/// One scalar unknown owned by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeOfFreedom {
    kind: DofKind,
    value: f64,
    fixed: bool,
    load: f64,

    /// Global equation number, assigned by each assembly pass
    #[serde(skip)]
    pub(crate) index: Option<usize>,
}

impl DegreeOfFreedom {
    /// Create a free, unloaded DOF at zero displacement
    pub fn new(kind: DofKind) -> Self {
        Self {
            kind,
            value: 0.0,
            fixed: false,
            load: 0.0,
            index: None,
        }
    }

    pub fn kind(&self) -> DofKind {
        self.kind
    }

    /// Current displacement (or prescribed value for a fixed DOF)
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    /// Reference applied load (before load factors)
    pub fn load(&self) -> f64 {
        self.load
    }

    pub fn set_load(&mut self, load: f64) {
        self.load = load;
    }

    pub fn add_load(&mut self, load: f64) {
        self.load += load;
    }

    pub fn reset_load(&mut self) {
        self.load = 0.0;
    }

    /// Global equation number from the most recent assembly; `None` when
    /// fixed or not yet assembled
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}
