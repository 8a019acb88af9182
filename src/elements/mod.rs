//! Finite elements
//!
//! Elements refer to their nodes by [`NodeId`] and own their materials.
//! [`Element::update_state`] is the only place where an element reads nodal
//! displacements; force and stiffness queries return what that call cached.
//! All element vectors and matrices are in the global frame, ordered node
//! by node with the element's DOF kinds inside each node.

pub mod beam2d;
pub mod frame2d;
pub mod loads;
pub mod triangle;
pub mod truss;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{DofHandle, DofKind, Node, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::materials::{Material, StateTag};
use crate::math::{Mat, Vector};
use crate::results::InternalForces;

pub use beam2d::{Beam2D, BeamConfig};
pub use frame2d::{Frame2D, FrameConfig};
pub use loads::ElementLoad;
pub use triangle::{LinearTriangle, TriangleConfig};
pub use truss::{Truss, TrussConfig};

/// Type tag of an element variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Truss,
    Beam2D,
    Frame2D,
    LinearTriangle,
}

/// Strain measure used by an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kinematics {
    /// Small displacements, constant geometry
    #[default]
    Linear,
    /// Large displacements (Green-Lagrange or von Kármán strains)
    Finite,
}

/// State shared by every element variant
#[derive(Debug, Clone)]
pub struct ElementCore {
    nodes: Vec<NodeId>,
    dof_kinds: Vec<DofKind>,
    tag: StateTag,
    force: Vector,
    stiffness: Mat,
    loads: Vec<ElementLoad>,
    load_factor: f64,
}

impl ElementCore {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            dof_kinds: Vec::new(),
            tag: StateTag::Uninitialized,
            force: Vector::zeros(0),
            stiffness: Mat::zeros(0, 0),
            loads: Vec::new(),
            load_factor: 1.0,
        }
    }

    pub(crate) fn set_dof_kinds(&mut self, kinds: Vec<DofKind>) {
        self.dof_kinds = kinds;
    }

    pub(crate) fn ndof(&self) -> usize {
        self.nodes.len() * self.dof_kinds.len()
    }

    /// Cache the result of an update
    pub(crate) fn store(&mut self, force: Vector, stiffness: Mat) {
        self.force = force;
        self.stiffness = stiffness;
        self.tag = StateTag::Updated;
    }

    /// The node slice must match the element's connectivity
    pub(crate) fn check_nodes(&self, nodes: &[&Node]) -> FEAResult<()> {
        if nodes.len() != self.nodes.len() {
            return Err(FEAError::InvalidInput(format!(
                "element expects {} nodes, got {}",
                self.nodes.len(),
                nodes.len()
            )));
        }
        Ok(())
    }

    /// Planar coordinates of the nodes, failing for 3D nodes
    pub(crate) fn planar_coordinates(
        &self,
        nodes: &[&Node],
        owner: ElementKind,
    ) -> FEAResult<Vec<[f64; 2]>> {
        self.check_nodes(nodes)?;
        nodes
            .iter()
            .map(|node| {
                if node.dim() != 2 {
                    return Err(FEAError::InvalidInput(format!(
                        "{:?} requires 2D nodes",
                        owner
                    )));
                }
                Ok(node.xy())
            })
            .collect()
    }

    /// Check the node slice handed to an update and collect the element's
    /// nodal displacement vector in the global frame
    pub(crate) fn displacements(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        self.check_nodes(nodes)?;
        if self.dof_kinds.is_empty() {
            return Err(FEAError::UninitializedState(
                "element DOFs (element not attached to a system)".to_string(),
            ));
        }
        let mut u = Vector::zeros(self.ndof());
        let n = self.dof_kinds.len();
        for (i, node) in nodes.iter().enumerate() {
            let ui = node.global_displacement(&self.dof_kinds)?;
            u.rows_mut(i * n, n).copy_from(&ui);
        }
        Ok(u)
    }
}

/// Saved internal state of one element
#[derive(Debug, Clone)]
pub struct ElementHistory {
    materials: Vec<Box<dyn Material>>,
    tag: StateTag,
    force: Vector,
    stiffness: Mat,
}

impl ElementHistory {
    pub(crate) fn material_count(&self) -> usize {
        self.materials.len()
    }
}

/// Element interface
pub trait Element: fmt::Debug {
    fn kind(&self) -> ElementKind;

    fn core(&self) -> &ElementCore;

    fn core_mut(&mut self) -> &mut ElementCore;

    /// Decide the per-node DOF kinds for nodes of dimension `dim`
    ///
    /// Called once when the element is added to a system.
    fn attach(&mut self, dim: usize) -> FEAResult<Vec<DofKind>>;

    /// Recompute strains from the current nodal displacements, push them
    /// into the materials and cache force and tangent stiffness
    fn update_state(&mut self, nodes: &[&Node]) -> FEAResult<()>;

    /// Consistent nodal equivalent of the applied element loads, unscaled
    fn equivalent_load(&self, nodes: &[&Node]) -> FEAResult<Vector>;

    fn accepts_load(&self, load: &ElementLoad) -> bool;

    fn materials(&self) -> Vec<&dyn Material>;

    fn materials_mut(&mut self) -> Vec<&mut Box<dyn Material>>;

    /// Axial force, shear and moment at `xi` in [0, 1] along a line element
    ///
    /// `load_factor` is the system load factor; element loads enter scaled
    /// by it and by the element's own factor.
    fn internal_force(
        &self,
        _nodes: &[&Node],
        _xi: f64,
        _load_factor: f64,
    ) -> FEAResult<InternalForces> {
        Err(FEAError::Unsupported(format!(
            "internal force interpolation on {:?}",
            self.kind()
        )))
    }

    fn nodes(&self) -> &[NodeId] {
        &self.core().nodes
    }

    fn dof_kinds(&self) -> &[DofKind] {
        &self.core().dof_kinds
    }

    /// Ordered global DOF handles coupled by this element
    fn dofs(&self) -> Vec<DofHandle> {
        let core = self.core();
        let kinds = &core.dof_kinds;
        core.nodes
            .iter()
            .flat_map(move |&node| kinds.iter().map(move |&kind| DofHandle { node, kind }))
            .collect()
    }

    fn state(&self) -> StateTag {
        self.core().tag
    }

    /// Internal force vector from the last update
    fn force(&self) -> FEAResult<&Vector> {
        let core = self.core();
        match core.tag {
            StateTag::Updated => Ok(&core.force),
            StateTag::Uninitialized => Err(FEAError::UninitializedState(format!(
                "{:?} force",
                self.kind()
            ))),
        }
    }

    /// Tangent stiffness from the last update
    fn stiffness(&self) -> FEAResult<&Mat> {
        let core = self.core();
        match core.tag {
            StateTag::Updated => Ok(&core.stiffness),
            StateTag::Uninitialized => Err(FEAError::UninitializedState(format!(
                "{:?} stiffness",
                self.kind()
            ))),
        }
    }

    fn add_load(&mut self, load: ElementLoad) -> FEAResult<()> {
        if !self.accepts_load(&load) {
            return Err(FEAError::Unsupported(format!(
                "{:?} on {:?}",
                load,
                self.kind()
            )));
        }
        self.core_mut().loads.push(load);
        Ok(())
    }

    fn loads(&self) -> &[ElementLoad] {
        &self.core().loads
    }

    /// Remove all applied element loads and reset the element load factor
    fn reset_loads(&mut self) {
        let core = self.core_mut();
        core.loads.clear();
        core.load_factor = 1.0;
    }

    fn set_load_factor(&mut self, factor: f64) {
        self.core_mut().load_factor = factor;
    }

    fn load_factor(&self) -> f64 {
        self.core().load_factor
    }

    /// Equivalent nodal loads scaled by the element load factor
    fn applied_load(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        Ok(self.equivalent_load(nodes)? * self.load_factor())
    }

    /// Promote the trial state of every material to committed history
    fn commit(&mut self) {
        for material in self.materials_mut() {
            material.commit();
        }
    }

    fn save_history(&self) -> ElementHistory {
        let core = self.core();
        ElementHistory {
            materials: self.materials().into_iter().map(|m| m.clone_box()).collect(),
            tag: core.tag,
            force: core.force.clone(),
            stiffness: core.stiffness.clone(),
        }
    }

    fn restore_history(&mut self, history: ElementHistory) -> FEAResult<()> {
        let mut slots = self.materials_mut();
        if slots.len() != history.materials.len() {
            return Err(FEAError::InvalidInput(format!(
                "history holds {} materials, element has {}",
                history.materials.len(),
                slots.len()
            )));
        }
        for (slot, saved) in slots.iter_mut().zip(history.materials) {
            **slot = saved;
        }
        let core = self.core_mut();
        core.tag = history.tag;
        core.force = history.force;
        core.stiffness = history.stiffness;
        Ok(())
    }

    /// Current stress (or stress resultant) of every material point
    fn material_stresses(&self) -> Vec<Vec<f64>> {
        self.materials()
            .into_iter()
            .map(|m| {
                m.stress()
                    .map(|s| s.iter().copied().collect::<Vec<f64>>())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Only 2D nodes can carry planar elements
pub(crate) fn require_planar(dim: usize, owner: ElementKind) -> FEAResult<()> {
    if dim != 2 {
        return Err(FEAError::InvalidInput(format!(
            "{:?} requires 2D nodes, got dimension {}",
            owner, dim
        )));
    }
    Ok(())
}
