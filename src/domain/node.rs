//! Node - a point in 2D or 3D space carrying degrees of freedom

use std::rc::Rc;

use super::{DegreeOfFreedom, DofKind, NodeId, Transformation};
use crate::error::{FEAError, FEAResult};
use crate::math::Vector;

/// A node of the finite element mesh
///
/// The DOF set is the union of what attached elements request, in
/// first-request order. Nodes never own elements.
#[derive(Debug, Clone)]
pub struct Node {
    /// Assigned when the node is added to a system
    pub(crate) id: Option<NodeId>,
    position: [f64; 3],
    dim: usize,
    dofs: Vec<DegreeOfFreedom>,
    history: Vec<Vec<f64>>,
    transform: Option<Rc<Transformation>>,
}

impl Node {
    /// Create a 2D node at (x, y)
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_dim([x, y, 0.0], 2)
    }

    /// Create a 3D node at (x, y, z)
    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self::with_dim([x, y, z], 3)
    }

    fn with_dim(position: [f64; 3], dim: usize) -> Self {
        Self {
            id: None,
            position,
            dim,
            dofs: Vec::new(),
            history: Vec::new(),
            transform: None,
        }
    }

    /// Pre-declare DOFs on a node before any element is attached
    pub fn with_dofs(mut self, kinds: &[DofKind]) -> Self {
        self.request_dofs(kinds);
        self
    }

    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Number of coordinates (2 or 3)
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Reference position
    pub fn position(&self) -> &[f64] {
        &self.position[..self.dim]
    }

    pub(crate) fn xy(&self) -> [f64; 2] {
        [self.position[0], self.position[1]]
    }

    /// Deformed position `X + scale * u` using the translational DOFs
    /// expressed in the global frame
    pub fn deformed_position(&self, scale: f64) -> Vec<f64> {
        let mut pos = self.position().to_vec();
        let kinds: Vec<DofKind> = self
            .dofs
            .iter()
            .map(|d| d.kind())
            .filter(|k| k.is_translation() && k.axis() < self.dim)
            .collect();
        if let Ok(u) = self.global_displacement(&kinds) {
            for (kind, value) in kinds.iter().zip(u.iter()) {
                pos[kind.axis()] += scale * value;
            }
        }
        pos
    }

    pub fn dofs(&self) -> &[DegreeOfFreedom] {
        &self.dofs
    }

    pub(crate) fn dofs_mut(&mut self) -> &mut [DegreeOfFreedom] {
        &mut self.dofs
    }

    pub fn dof_kinds(&self) -> Vec<DofKind> {
        self.dofs.iter().map(|d| d.kind()).collect()
    }

    pub fn has_dof(&self, kind: DofKind) -> bool {
        self.dofs.iter().any(|d| d.kind() == kind)
    }

    /// Local position of a DOF in this node's list
    pub fn dof_position(&self, kind: DofKind) -> FEAResult<usize> {
        self.dofs
            .iter()
            .position(|d| d.kind() == kind)
            .ok_or(FEAError::UnknownDof {
                node: self.id.map(|id| id.0),
                dof: kind,
            })
    }

    pub fn dof(&self, kind: DofKind) -> FEAResult<&DegreeOfFreedom> {
        let i = self.dof_position(kind)?;
        Ok(&self.dofs[i])
    }

    fn positions(&self, kinds: &[DofKind]) -> FEAResult<Vec<usize>> {
        kinds.iter().map(|&k| self.dof_position(k)).collect()
    }

    /// Add the listed DOFs if not yet present; returns their local positions
    pub(crate) fn request_dofs(&mut self, kinds: &[DofKind]) -> Vec<usize> {
        kinds
            .iter()
            .map(|&kind| match self.dofs.iter().position(|d| d.kind() == kind) {
                Some(i) => i,
                None => {
                    self.dofs.push(DegreeOfFreedom::new(kind));
                    for saved in &mut self.history {
                        saved.push(0.0);
                    }
                    self.dofs.len() - 1
                }
            })
            .collect()
    }

    /// Restrain the listed DOFs; they leave the unknown set at the next assembly
    pub fn fix_dof(&mut self, kinds: &[DofKind]) -> FEAResult<()> {
        for i in self.positions(kinds)? {
            self.dofs[i].set_fixed(true);
        }
        Ok(())
    }

    /// Remove a restraint
    pub fn release_dof(&mut self, kinds: &[DofKind]) -> FEAResult<()> {
        for i in self.positions(kinds)? {
            self.dofs[i].set_fixed(false);
        }
        Ok(())
    }

    pub fn is_fixed(&self, kind: DofKind) -> FEAResult<bool> {
        Ok(self.dof(kind)?.is_fixed())
    }

    fn check_lengths(values: &[f64], kinds: &[DofKind]) -> FEAResult<()> {
        if values.len() != kinds.len() {
            return Err(FEAError::InvalidInput(format!(
                "{} values given for {} DOFs",
                values.len(),
                kinds.len()
            )));
        }
        Ok(())
    }

    /// Set displacements; on fixed DOFs this prescribes the support motion
    pub fn set_disp(&mut self, values: &[f64], kinds: &[DofKind]) -> FEAResult<()> {
        Self::check_lengths(values, kinds)?;
        for (i, &v) in self.positions(kinds)?.into_iter().zip(values) {
            self.dofs[i].set_value(v);
        }
        Ok(())
    }

    /// Displacements of the listed DOFs in this node's frame
    pub fn disp(&self, kinds: &[DofKind]) -> FEAResult<Vec<f64>> {
        Ok(self
            .positions(kinds)?
            .into_iter()
            .map(|i| self.dofs[i].value())
            .collect())
    }

    /// All displacements in DOF order
    pub fn displacement(&self) -> Vec<f64> {
        self.dofs.iter().map(|d| d.value()).collect()
    }

    /// Displacements of the listed DOFs rotated into the global frame
    pub fn global_displacement(&self, kinds: &[DofKind]) -> FEAResult<Vector> {
        let local = Vector::from_vec(self.disp(kinds)?);
        match &self.transform {
            Some(t) => Ok(t.block(kinds)?.transpose() * local),
            None => Ok(local),
        }
    }

    /// Accumulate reference loads
    pub fn add_load(&mut self, values: &[f64], kinds: &[DofKind]) -> FEAResult<()> {
        Self::check_lengths(values, kinds)?;
        for (i, &v) in self.positions(kinds)?.into_iter().zip(values) {
            self.dofs[i].add_load(v);
        }
        Ok(())
    }

    /// Overwrite reference loads
    pub fn set_load(&mut self, values: &[f64], kinds: &[DofKind]) -> FEAResult<()> {
        Self::check_lengths(values, kinds)?;
        for (i, &v) in self.positions(kinds)?.into_iter().zip(values) {
            self.dofs[i].set_load(v);
        }
        Ok(())
    }

    /// Reference loads in DOF order
    pub fn load(&self) -> Vec<f64> {
        self.dofs.iter().map(|d| d.load()).collect()
    }

    pub fn has_load(&self) -> bool {
        self.dofs.iter().any(|d| d.load() != 0.0)
    }

    /// Save the current displacement on this node's history stack
    pub fn push_u(&mut self) {
        self.history.push(self.displacement());
    }

    /// Restore the most recently pushed displacement
    pub fn pop_u(&mut self) -> FEAResult<()> {
        let saved = self.history.pop().ok_or_else(|| {
            FEAError::StateStackEmpty(format!(
                "pop_u without matching push_u at node {:?}",
                self.id.map(|id| id.0)
            ))
        })?;
        for (dof, value) in self.dofs.iter_mut().zip(saved) {
            dof.set_value(value);
        }
        Ok(())
    }

    /// Depth of the displacement history stack
    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn reset_disp(&mut self) {
        for dof in &mut self.dofs {
            dof.set_value(0.0);
        }
    }

    pub fn reset_load(&mut self) {
        for dof in &mut self.dofs {
            dof.reset_load();
        }
    }

    pub fn reset_all(&mut self) {
        self.reset_disp();
        self.reset_load();
    }

    /// Attach a local frame; loads, fixity and displacements of this node
    /// are then interpreted in that frame
    pub fn set_transformation(&mut self, transform: Rc<Transformation>) {
        self.transform = Some(transform);
    }

    pub fn transformation(&self) -> Option<&Transformation> {
        self.transform.as_deref()
    }

    pub(crate) fn set_values_unchecked(&mut self, values: &[f64]) {
        for (dof, &v) in self.dofs.iter_mut().zip(values) {
            dof.set_value(v);
        }
    }
}
