//! Read-only result reports
//!
//! Reports are plain serializable snapshots of the system between solves.
//! They are the only thing plotting or export layers should consume.

use serde::{Deserialize, Serialize};

use crate::domain::{DofKind, ElementId, NodeId};
use crate::elements::ElementKind;
use crate::error::FEAResult;
use crate::materials::StateTag;

/// Sectional forces at a station along a beam or frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InternalForces {
    /// Distance from the first node
    pub position: f64,
    /// Axial force (positive = tension)
    pub axial: f64,
    /// Transverse shear force
    pub shear: f64,
    /// Bending moment (positive = positive curvature)
    pub moment: f64,
}

/// One DOF of a node report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DofReport {
    pub kind: DofKind,
    /// Current displacement (prescribed value when fixed)
    pub displacement: f64,
    pub fixed: bool,
    /// Applied load at the current load factor
    pub load: f64,
    /// Support reaction, only for fixed DOFs
    pub reaction: Option<f64>,
}

/// Node state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: NodeId,
    /// Reference position
    pub position: Vec<f64>,
    /// Deformed position at unit scale
    pub deformed: Vec<f64>,
    pub dofs: Vec<DofReport>,
}

impl NodeReport {
    pub fn dof(&self, kind: DofKind) -> Option<&DofReport> {
        self.dofs.iter().find(|d| d.kind == kind)
    }

    /// Translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        self.dofs
            .iter()
            .filter(|d| d.kind.is_translation())
            .map(|d| d.displacement.powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Plane stress components with derived invariants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaneStressState {
    pub sx: f64,
    pub sy: f64,
    pub txy: f64,
    /// Von Mises equivalent stress (in-plane components only)
    pub von_mises: f64,
    /// Maximum principal stress
    pub s1: f64,
    /// Minimum principal stress
    pub s2: f64,
}

impl PlaneStressState {
    pub fn from_components(sx: f64, sy: f64, txy: f64) -> Self {
        let von_mises = (sx.powi(2) - sx * sy + sy.powi(2) + 3.0 * txy.powi(2)).sqrt();

        let s_avg = (sx + sy) / 2.0;
        let r = ((sx - sy).powi(2) / 4.0 + txy.powi(2)).sqrt();

        Self {
            sx,
            sy,
            txy,
            von_mises,
            s1: s_avg + r,
            s2: s_avg - r,
        }
    }
}

/// Element state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementReport {
    pub id: ElementId,
    pub kind: ElementKind,
    pub nodes: Vec<NodeId>,
    pub state: StateTag,
    /// Internal force vector (global frame), absent before the first update
    pub force: Option<Vec<f64>>,
    /// Tangent stiffness rows, absent before the first update
    pub stiffness: Option<Vec<Vec<f64>>>,
    /// Stress or stress resultant of every material point
    pub stresses: Vec<Vec<f64>>,
    /// Stress invariants for continuum elements
    pub plane_stress: Option<PlaneStressState>,
}

/// Complete system state between solves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemReport {
    pub load_factor: f64,
    pub nodes: Vec<NodeReport>,
    pub elements: Vec<ElementReport>,
    pub summary: SystemSummary,
}

impl SystemReport {
    pub fn node(&self, id: NodeId) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn element(&self, id: ElementId) -> Option<&ElementReport> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> FEAResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Headline numbers of a report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemSummary {
    pub num_nodes: usize,
    pub num_elements: usize,
    /// All DOFs
    pub total_dofs: usize,
    /// Unknown (non-fixed) DOFs
    pub free_dofs: usize,
    /// Largest translation magnitude
    pub max_displacement: f64,
    pub max_disp_node: Option<NodeId>,
    /// Largest absolute reaction component
    pub max_reaction: f64,
    pub max_reaction_node: Option<NodeId>,
}

impl SystemSummary {
    pub(crate) fn from_nodes(nodes: &[NodeReport], num_elements: usize) -> Self {
        let mut summary = Self {
            num_nodes: nodes.len(),
            num_elements,
            ..Self::default()
        };
        for node in nodes {
            summary.total_dofs += node.dofs.len();
            summary.free_dofs += node.dofs.iter().filter(|d| !d.fixed).count();

            let disp = node.translation_magnitude();
            if disp > summary.max_displacement {
                summary.max_displacement = disp;
                summary.max_disp_node = Some(node.id);
            }
            for reaction in node.dofs.iter().filter_map(|d| d.reaction) {
                if reaction.abs() > summary.max_reaction {
                    summary.max_reaction = reaction.abs();
                    summary.max_reaction_node = Some(node.id);
                }
            }
        }
        summary
    }
}
