//! The system: owner of all nodes and elements, global assembly and the
//! state stack used to roll back rejected load steps

use std::borrow::Cow;

use log::{debug, info, trace};

use super::{DofHandle, ElementId, Node, NodeId, Probe, Recorder};
use crate::elements::{Element, ElementHistory, ElementKind};
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, SparseMatrixBuilder, Vector};
use crate::results::{
    DofReport, ElementReport, InternalForces, NodeReport, PlaneStressState, SystemReport,
    SystemSummary,
};

/// Storage of the assembled tangent stiffness
#[derive(Debug, Clone)]
pub enum Tangent {
    Dense(Mat),
    /// Triplets, converted to CSR when solved
    Sparse(SparseMatrixBuilder),
}

impl Tangent {
    fn zeros(n: usize, sparse: bool) -> Self {
        if sparse {
            Tangent::Sparse(SparseMatrixBuilder::new(n))
        } else {
            Tangent::Dense(Mat::zeros(n, n))
        }
    }

    /// Scatter an element matrix; `None` entries are fixed DOFs
    fn add_element_matrix(&mut self, index: &[Option<usize>], k: &Mat) {
        match self {
            Tangent::Dense(m) => {
                for (a, ia) in index.iter().enumerate() {
                    let Some(i) = *ia else { continue };
                    for (b, ib) in index.iter().enumerate() {
                        if let Some(j) = *ib {
                            m[(i, j)] += k[(a, b)];
                        }
                    }
                }
            }
            Tangent::Sparse(builder) => builder.add_element_matrix(index, k),
        }
    }

    /// Stored entries: n² for dense storage, triplets for sparse
    pub fn stored_entries(&self) -> usize {
        match self {
            Tangent::Dense(m) => m.len(),
            Tangent::Sparse(builder) => builder.nnz(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Tangent::Sparse(_))
    }
}

/// Global equations at the current displacement state, sized to the free DOFs
#[derive(Debug, Clone)]
pub struct Assembly {
    stiffness: Tangent,
    residual: Vector,
    external: Vector,
    internal: Vector,
    dofs: Vec<DofHandle>,
}

impl Assembly {
    /// Tangent stiffness as a dense matrix, expanded if stored sparse
    pub fn stiffness(&self) -> Cow<'_, Mat> {
        match &self.stiffness {
            Tangent::Dense(m) => Cow::Borrowed(m),
            Tangent::Sparse(builder) => Cow::Owned(builder.to_dense()),
        }
    }

    pub fn tangent(&self) -> &Tangent {
        &self.stiffness
    }

    /// External minus internal force
    pub fn residual(&self) -> &Vector {
        &self.residual
    }

    /// Applied load at the current load factor
    pub fn external(&self) -> &Vector {
        &self.external
    }

    /// Internal resisting force
    pub fn internal(&self) -> &Vector {
        &self.internal
    }

    /// Handle of every free DOF, indexed by equation number
    pub fn dofs(&self) -> &[DofHandle] {
        &self.dofs
    }

    pub fn size(&self) -> usize {
        self.dofs.len()
    }
}

/// Complete analysis state: displacements, load factor and element history
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    load_factor: f64,
    displacements: Vec<Vec<f64>>,
    histories: Vec<ElementHistory>,
}

impl SystemSnapshot {
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    pub fn displacement(&self, node: NodeId) -> Option<&[f64]> {
        self.displacements.get(node.0).map(|d| d.as_slice())
    }
}

/// Global DOF locations of an element and its node-frame transformation
struct Scatter {
    /// (node index, DOF position in node) per element DOF
    locations: Vec<(usize, usize)>,
    transform: Option<Mat>,
}

impl Scatter {
    fn new(nodes: &[Node], element: &dyn Element) -> FEAResult<Self> {
        let kinds = element.dof_kinds();
        let n = kinds.len();
        let ndof = n * element.nodes().len();
        let mut locations = Vec::with_capacity(ndof);
        let mut transform: Option<Mat> = None;

        for (a, id) in element.nodes().iter().enumerate() {
            let node = nodes.get(id.0).ok_or(FEAError::UnknownNode(id.0))?;
            for &kind in kinds {
                locations.push((id.0, node.dof_position(kind)?));
            }
            if let Some(t) = node.transformation() {
                let block = t.block(kinds)?;
                transform
                    .get_or_insert_with(|| Mat::identity(ndof, ndof))
                    .view_mut((a * n, a * n), (n, n))
                    .copy_from(&block);
            }
        }
        Ok(Self { locations, transform })
    }

    fn vector(&self, v: &Vector) -> Vector {
        match &self.transform {
            Some(t) => t * v,
            None => v.clone(),
        }
    }

    fn matrix(&self, m: &Mat) -> Mat {
        match &self.transform {
            Some(t) => t * m * t.transpose(),
            None => m.clone(),
        }
    }
}

fn gather<'a>(nodes: &'a [Node], ids: &[NodeId]) -> FEAResult<Vec<&'a Node>> {
    ids.iter()
        .map(|id| nodes.get(id.0).ok_or(FEAError::UnknownNode(id.0)))
        .collect()
}

/// Owns the model and performs assembly
///
/// Nodes and elements are added once and live for the whole analysis;
/// their ids are indices into the system's arenas.
#[derive(Debug, Default)]
pub struct System {
    nodes: Vec<Node>,
    elements: Vec<Box<dyn Element>>,
    load_factor: f64,
    stack: Vec<SystemSnapshot>,
    recorder: Option<Recorder>,
    assembly: Option<Assembly>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its id
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = Some(id);
        self.nodes.push(node);
        self.assembly = None;
        id
    }

    /// Register an element; its DOF kinds are requested on every node it
    /// connects
    pub fn add_element<E: Element + 'static>(&mut self, element: E) -> FEAResult<ElementId> {
        self.add_boxed_element(Box::new(element))
    }

    pub fn add_boxed_element(&mut self, mut element: Box<dyn Element>) -> FEAResult<ElementId> {
        let ids = element.nodes().to_vec();
        let nodes = gather(&self.nodes, &ids)?;
        let dim = nodes.first().map(|n| n.dim()).ok_or_else(|| {
            FEAError::InvalidInput("element without nodes".to_string())
        })?;
        if nodes.iter().any(|n| n.dim() != dim) {
            return Err(FEAError::InvalidInput(format!(
                "{:?} connects nodes of different dimension",
                element.kind()
            )));
        }

        let kinds = element.attach(dim)?;
        for id in &ids {
            self.nodes[id.0].request_dofs(&kinds);
        }

        let id = ElementId(self.elements.len());
        debug!("added {:?} {} on nodes {:?}", element.kind(), id, ids);
        self.elements.push(element);
        self.assembly = None;
        Ok(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> FEAResult<&Node> {
        self.nodes.get(id.0).ok_or(FEAError::UnknownNode(id.0))
    }

    /// Mutable node access; invalidates the current assembly
    pub fn node_mut(&mut self, id: NodeId) -> FEAResult<&mut Node> {
        self.assembly = None;
        self.nodes.get_mut(id.0).ok_or(FEAError::UnknownNode(id.0))
    }

    pub fn elements(&self) -> &[Box<dyn Element>] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> FEAResult<&dyn Element> {
        self.elements
            .get(id.0)
            .map(|e| e.as_ref())
            .ok_or(FEAError::UnknownElement(id.0))
    }

    /// Mutable element access (loads, load factor); invalidates the current assembly
    pub fn element_mut(&mut self, id: ElementId) -> FEAResult<&mut Box<dyn Element>> {
        self.assembly = None;
        self.elements
            .get_mut(id.0)
            .ok_or(FEAError::UnknownElement(id.0))
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Set the global multiplier applied to all loads at the next assembly
    pub fn set_load_factor(&mut self, load_factor: f64) {
        self.load_factor = load_factor;
        self.assembly = None;
    }

    /// Most recent assembly, if still consistent with the model
    pub fn assembly(&self) -> Option<&Assembly> {
        self.assembly.as_ref()
    }

    /// Assign equation numbers in node order, skipping fixed DOFs
    pub fn number_dofs(&mut self) -> Vec<DofHandle> {
        let mut handles = Vec::new();
        for (n, node) in self.nodes.iter_mut().enumerate() {
            for dof in node.dofs_mut() {
                if dof.is_fixed() {
                    dof.index = None;
                } else {
                    dof.index = Some(handles.len());
                    handles.push(DofHandle {
                        node: NodeId(n),
                        kind: dof.kind(),
                    });
                }
            }
        }
        handles
    }

    /// Handles of the free DOFs in equation order
    pub fn free_dofs(&mut self) -> Vec<DofHandle> {
        self.number_dofs()
    }

    /// Update every element at the current displacements and build the
    /// tangent stiffness and residual over the free DOFs
    pub fn assemble(&mut self) -> FEAResult<&Assembly> {
        self.assemble_into(false)
    }

    /// As [`System::assemble`], with the tangent kept in sparse triplet form
    pub fn assemble_sparse(&mut self) -> FEAResult<&Assembly> {
        self.assemble_into(true)
    }

    fn assemble_into(&mut self, sparse: bool) -> FEAResult<&Assembly> {
        let handles = self.number_dofs();
        let n = handles.len();
        let lambda = self.load_factor;

        for element in self.elements.iter_mut() {
            let nodes = gather(&self.nodes, element.nodes())?;
            element.update_state(&nodes)?;
        }

        let mut stiffness = Tangent::zeros(n, sparse);
        let mut internal = Vector::zeros(n);
        let mut external = Vector::zeros(n);

        for node in &self.nodes {
            for dof in node.dofs() {
                if let Some(i) = dof.index() {
                    external[i] += lambda * dof.load();
                }
            }
        }

        for element in &self.elements {
            let map = Scatter::new(&self.nodes, element.as_ref())?;
            let nodes = gather(&self.nodes, element.nodes())?;
            let force = map.vector(element.force()?);
            let k = map.matrix(element.stiffness()?);
            let applied = map.vector(&element.applied_load(&nodes)?) * lambda;

            let index: Vec<Option<usize>> = map
                .locations
                .iter()
                .map(|&(node, pos)| self.nodes[node].dofs()[pos].index())
                .collect();
            for (a, ia) in index.iter().enumerate() {
                if let Some(i) = *ia {
                    internal[i] += force[a];
                    external[i] += applied[a];
                }
            }
            stiffness.add_element_matrix(&index, &k);
        }

        let residual = &external - &internal;
        trace!(
            "assembled {} equations from {} elements (λ = {}, {} stored entries)",
            n,
            self.elements.len(),
            lambda,
            stiffness.stored_entries()
        );
        Ok(self.assembly.insert(Assembly {
            stiffness,
            residual,
            external,
            internal,
            dofs: handles,
        }))
    }

    /// Add a solution increment to the free DOFs of the last assembly
    pub fn apply_increment(&mut self, du: &Vector) -> FEAResult<()> {
        let n = self
            .assembly
            .as_ref()
            .map(|a| a.size())
            .ok_or_else(|| FEAError::UninitializedState("assembly".to_string()))?;
        if du.len() != n {
            return Err(FEAError::InvalidInput(format!(
                "increment has {} entries for {} free DOFs",
                du.len(),
                n
            )));
        }
        for node in &mut self.nodes {
            for dof in node.dofs_mut() {
                if let Some(i) = dof.index() {
                    dof.set_value(dof.value() + du[i]);
                }
            }
        }
        self.assembly = None;
        Ok(())
    }

    /// Capture displacements, load factor and element history
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            load_factor: self.load_factor,
            displacements: self.nodes.iter().map(|n| n.displacement()).collect(),
            histories: self.elements.iter().map(|e| e.save_history()).collect(),
        }
    }

    fn check_snapshot(&self, snapshot: &SystemSnapshot) -> FEAResult<()> {
        let compatible = snapshot.displacements.len() == self.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&snapshot.displacements)
                .all(|(n, d)| n.dofs().len() == d.len())
            && snapshot.histories.len() == self.elements.len()
            && self
                .elements
                .iter()
                .zip(&snapshot.histories)
                .all(|(e, h)| e.materials().len() == h.material_count());
        if !compatible {
            return Err(FEAError::InvalidInput(
                "snapshot does not match the current model".to_string(),
            ));
        }
        Ok(())
    }

    /// Restore a snapshot taken from this model
    pub fn restore(&mut self, snapshot: SystemSnapshot) -> FEAResult<()> {
        self.check_snapshot(&snapshot)?;
        for (node, values) in self.nodes.iter_mut().zip(&snapshot.displacements) {
            node.set_values_unchecked(values);
        }
        for (element, history) in self.elements.iter_mut().zip(snapshot.histories) {
            element.restore_history(history)?;
        }
        self.load_factor = snapshot.load_factor;
        self.assembly = None;
        Ok(())
    }

    /// Push the current state onto the rollback stack
    pub fn push_state(&mut self) {
        let snapshot = self.snapshot();
        self.stack.push(snapshot);
    }

    /// Restore and remove the most recently pushed state
    pub fn pop_state(&mut self) -> FEAResult<()> {
        let top = self
            .stack
            .last()
            .ok_or_else(|| FEAError::StateStackEmpty("pop_state without push_state".to_string()))?;
        self.check_snapshot(top)?;
        match self.stack.pop() {
            Some(snapshot) => self.restore(snapshot),
            None => Err(FEAError::StateStackEmpty("pop_state without push_state".to_string())),
        }
    }

    /// Discard the most recently pushed state without restoring it
    pub fn release_state(&mut self) -> FEAResult<()> {
        self.stack.pop().map(|_| ()).ok_or_else(|| {
            FEAError::StateStackEmpty("release_state without push_state".to_string())
        })
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Accept the current trial state of all materials as converged
    pub fn commit(&mut self) {
        for element in &mut self.elements {
            element.commit();
        }
    }

    /// Zero all displacements (fixity and loads are kept)
    pub fn reset_disp(&mut self) {
        for node in &mut self.nodes {
            node.reset_disp();
        }
        self.assembly = None;
    }

    /// Remove all nodal and element loads
    pub fn reset_loads(&mut self) {
        for node in &mut self.nodes {
            node.reset_load();
        }
        for element in &mut self.elements {
            element.reset_loads();
        }
        self.assembly = None;
    }

    /// Internal force minus applied element load, per node and DOF in the
    /// node's frame, from the elements' last update
    pub fn nodal_resisting_forces(&self) -> FEAResult<Vec<Vec<f64>>> {
        let lambda = self.load_factor;
        let mut totals: Vec<Vec<f64>> =
            self.nodes.iter().map(|n| vec![0.0; n.dofs().len()]).collect();
        for element in &self.elements {
            let map = Scatter::new(&self.nodes, element.as_ref())?;
            let nodes = gather(&self.nodes, element.nodes())?;
            let net = map.vector(&(element.force()? - element.applied_load(&nodes)? * lambda));
            for (a, &(node, pos)) in map.locations.iter().enumerate() {
                totals[node][pos] += net[a];
            }
        }
        Ok(totals)
    }

    /// Support reactions at all fixed DOFs
    pub fn reactions(&self) -> FEAResult<Vec<(DofHandle, f64)>> {
        let resisting = self.nodal_resisting_forces()?;
        let lambda = self.load_factor;
        let mut out = Vec::new();
        for (n, node) in self.nodes.iter().enumerate() {
            for (pos, dof) in node.dofs().iter().enumerate() {
                if dof.is_fixed() {
                    let handle = DofHandle {
                        node: NodeId(n),
                        kind: dof.kind(),
                    };
                    out.push((handle, resisting[n][pos] - lambda * dof.load()));
                }
            }
        }
        Ok(out)
    }

    /// Axial force, shear and moment at `xi` in [0, 1] along a line element
    pub fn internal_force(&self, id: ElementId, xi: f64) -> FEAResult<InternalForces> {
        let element = self.element(id)?;
        let nodes = gather(&self.nodes, element.nodes())?;
        element.internal_force(&nodes, xi, self.load_factor)
    }

    /// Start capturing the given probes after each converged step
    pub fn start_recorder(&mut self, probes: Vec<Probe>) {
        self.recorder = Some(Recorder::new(probes));
    }

    pub fn stop_recorder(&mut self) {
        if let Some(recorder) = &mut self.recorder {
            recorder.stop();
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(|r| r.is_active())
    }

    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    /// Capture every probe at the current state
    pub fn record_this_step(&mut self) -> FEAResult<()> {
        let probes = match &self.recorder {
            Some(r) if r.is_active() => r.probes().to_vec(),
            _ => return Err(FEAError::InvalidInput("recorder is not running".to_string())),
        };
        let needs_reactions = probes.iter().any(|p| matches!(p, Probe::Reaction { .. }));
        let resisting = if needs_reactions {
            Some(self.nodal_resisting_forces()?)
        } else {
            None
        };

        let mut values = Vec::with_capacity(probes.len());
        for probe in &probes {
            let value = match *probe {
                Probe::LoadFactor => self.load_factor,
                Probe::Displacement { node, dof } => self.node(node)?.dof(dof)?.value(),
                Probe::Reaction { node, dof } => {
                    let n = self.node(node)?;
                    let pos = n.dof_position(dof)?;
                    let total = resisting.as_ref().map_or(0.0, |r| r[node.0][pos]);
                    total - self.load_factor * n.dofs()[pos].load()
                }
            };
            values.push(value);
        }

        if let Some(recorder) = &mut self.recorder {
            recorder.push(values);
        }
        Ok(())
    }

    /// Recorded history of one probe
    pub fn fetch_record(&self, probe: &Probe) -> FEAResult<Vec<f64>> {
        self.recorder
            .as_ref()
            .ok_or_else(|| FEAError::InvalidInput("no recorder was started".to_string()))?
            .series(probe)
    }

    /// Read-only snapshot of nodes and elements for reporting
    pub fn report(&self) -> SystemReport {
        let lambda = self.load_factor;
        let resisting = self.nodal_resisting_forces().ok();

        let nodes: Vec<NodeReport> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(n, node)| NodeReport {
                id: NodeId(n),
                position: node.position().to_vec(),
                deformed: node.deformed_position(1.0),
                dofs: node
                    .dofs()
                    .iter()
                    .enumerate()
                    .map(|(pos, dof)| DofReport {
                        kind: dof.kind(),
                        displacement: dof.value(),
                        fixed: dof.is_fixed(),
                        load: lambda * dof.load(),
                        reaction: match (&resisting, dof.is_fixed()) {
                            (Some(r), true) => Some(r[n][pos] - lambda * dof.load()),
                            _ => None,
                        },
                    })
                    .collect(),
            })
            .collect();

        let elements: Vec<ElementReport> = self
            .elements
            .iter()
            .enumerate()
            .map(|(e, element)| {
                let stresses = element.material_stresses();
                let plane_stress = match (element.kind(), stresses.first()) {
                    (ElementKind::LinearTriangle, Some(s)) if s.len() == 3 => {
                        Some(PlaneStressState::from_components(s[0], s[1], s[2]))
                    }
                    _ => None,
                };
                ElementReport {
                    id: ElementId(e),
                    kind: element.kind(),
                    nodes: element.nodes().to_vec(),
                    state: element.state(),
                    force: element.force().ok().map(|f| f.iter().copied().collect()),
                    stiffness: element.stiffness().ok().map(|k| {
                        k.row_iter().map(|row| row.iter().copied().collect()).collect()
                    }),
                    stresses,
                    plane_stress,
                }
            })
            .collect();

        let summary = SystemSummary::from_nodes(&nodes, elements.len());
        info!(
            "report: {} nodes, {} elements, {} free DOFs, λ = {}",
            summary.num_nodes, summary.num_elements, summary.free_dofs, lambda
        );
        SystemReport {
            load_factor: lambda,
            nodes,
            elements,
            summary,
        }
    }
}
