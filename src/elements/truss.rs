//! Two-node truss (bar) element in 2D or 3D

use serde::{Deserialize, Serialize};

use super::{Element, ElementCore, ElementKind, ElementLoad, Kinematics};
use crate::domain::{DofKind, Node, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::materials::{expect_strain_size, Material};
use crate::math::{Mat, Vector, GEOMETRY_TOLERANCE};

/// Truss configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrussConfig {
    /// Cross-sectional area
    #[serde(rename = "A")]
    pub area: f64,
    /// Strain measure
    pub kinematics: Kinematics,
}

impl Default for TrussConfig {
    fn default() -> Self {
        Self {
            area: 1.0,
            kinematics: Kinematics::Linear,
        }
    }
}

impl TrussConfig {
    /// Use Green-Lagrange axial strain
    pub fn finite(mut self) -> Self {
        self.kinematics = Kinematics::Finite;
        self
    }
}

/// Axial-force-only member between two nodes
#[derive(Debug, Clone)]
pub struct Truss {
    core: ElementCore,
    config: TrussConfig,
    material: Box<dyn Material>,
    dim: usize,
}

impl Truss {
    /// Create a truss; the material must be uniaxial
    pub fn new(
        i_node: NodeId,
        j_node: NodeId,
        material: Box<dyn Material>,
        config: TrussConfig,
    ) -> FEAResult<Self> {
        expect_strain_size(material.as_ref(), 1, "truss")?;
        if config.area <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "truss area must be positive, got {}",
                config.area
            )));
        }
        Ok(Self {
            core: ElementCore::new(vec![i_node, j_node]),
            config,
            material,
            dim: 0,
        })
    }

    pub fn config(&self) -> &TrussConfig {
        &self.config
    }

    /// Current axial force (tension positive)
    pub fn axial_force(&self) -> FEAResult<f64> {
        Ok(self.material.stress()?[0] * self.config.area)
    }

    /// Reference length vector `X_j - X_i` and its length
    fn reference(&self, nodes: &[&Node]) -> FEAResult<(Vector, f64)> {
        self.core.check_nodes(nodes)?;
        if nodes.iter().any(|n| n.dim() != self.dim) {
            return Err(FEAError::InvalidInput(format!(
                "truss attached in {}D got nodes of another dimension",
                self.dim
            )));
        }
        let dx = Vector::from_column_slice(nodes[1].position())
            - Vector::from_column_slice(nodes[0].position());
        let length = dx.norm();
        if length < GEOMETRY_TOLERANCE {
            return Err(FEAError::DegenerateGeometry(format!(
                "truss between {:?} and {:?} has zero length",
                self.core.nodes[0], self.core.nodes[1]
            )));
        }
        Ok((dx, length))
    }
}

/// Expand a d×d block `k` into the 2d×2d pattern `[[k, -k], [-k, k]]`
fn two_node_block(k: &Mat) -> Mat {
    let d = k.nrows();
    let mut out = Mat::zeros(2 * d, 2 * d);
    out.view_mut((0, 0), (d, d)).copy_from(k);
    out.view_mut((d, d), (d, d)).copy_from(k);
    out.view_mut((0, d), (d, d)).copy_from(&(-k));
    out.view_mut((d, 0), (d, d)).copy_from(&(-k));
    out
}

impl Element for Truss {
    fn kind(&self) -> ElementKind {
        ElementKind::Truss
    }

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn attach(&mut self, dim: usize) -> FEAResult<Vec<DofKind>> {
        let kinds = match dim {
            2 => vec![DofKind::Ux, DofKind::Uy],
            3 => vec![DofKind::Ux, DofKind::Uy, DofKind::Uz],
            _ => {
                return Err(FEAError::InvalidInput(format!(
                    "truss nodes must be 2D or 3D, got {}",
                    dim
                )))
            }
        };
        self.dim = dim;
        self.core.set_dof_kinds(kinds.clone());
        Ok(kinds)
    }

    fn update_state(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        let u = self.core.displacements(nodes)?;
        let (dx, length) = self.reference(nodes)?;
        let d = self.dim;
        let du = u.rows(d, d) - u.rows(0, d);
        let area = self.config.area;

        // direction vector whose outer product builds the material stiffness
        let (strain, direction) = match self.config.kinematics {
            Kinematics::Linear => {
                let n = &dx / length;
                (n.dot(&du) / length, n)
            }
            Kinematics::Finite => {
                let x = &dx + &du;
                ((x.dot(&x) - length * length) / (2.0 * length * length), x / length)
            }
        };

        self.material.set_strain(&[strain])?;
        let axial = self.material.stress()?[0] * area;
        let ea = self.material.stiffness()?[(0, 0)] * area;

        let mut force = Vector::zeros(2 * d);
        force.rows_mut(d, d).copy_from(&(&direction * axial));
        force.rows_mut(0, d).copy_from(&(&direction * -axial));

        let mut k = &direction * direction.transpose() * (ea / length);
        if self.config.kinematics == Kinematics::Finite {
            k += Mat::identity(d, d) * (axial / length);
        }

        self.core.store(force, two_node_block(&k));
        Ok(())
    }

    fn equivalent_load(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        self.core.check_nodes(nodes)?;
        Ok(Vector::zeros(self.core.ndof()))
    }

    fn accepts_load(&self, _load: &ElementLoad) -> bool {
        false
    }

    fn materials(&self) -> Vec<&dyn Material> {
        vec![self.material.as_ref()]
    }

    fn materials_mut(&mut self) -> Vec<&mut Box<dyn Material>> {
        vec![&mut self.material]
    }
}
