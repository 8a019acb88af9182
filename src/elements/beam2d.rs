//! Two-node Euler-Bernoulli beam along the global x-axis
//!
//! DOFs per node are `[uy, rz]`. Bending is integrated with Gauss points,
//! each holding its own section material fed with `[0, κ]`.

use serde::{Deserialize, Serialize};

use super::loads::{line_internal_forces, line_load_totals};
use super::{require_planar, Element, ElementCore, ElementKind, ElementLoad};
use crate::domain::{DofKind, Node, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::materials::{expect_strain_size, Material};
use crate::math::{gauss_points, Mat, Vector, GEOMETRY_TOLERANCE};
use crate::results::InternalForces;

/// Beam configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeamConfig {
    /// Gauss points along the axis (1 to 4)
    pub integration_points: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            integration_points: 2,
        }
    }
}

/// First derivatives d/dx of the cubic Hermite functions at `xi = x / L`
pub(crate) fn hermite_slopes(xi: f64, length: f64) -> [f64; 4] {
    [
        (-6.0 * xi + 6.0 * xi * xi) / length,
        1.0 - 4.0 * xi + 3.0 * xi * xi,
        (6.0 * xi - 6.0 * xi * xi) / length,
        -2.0 * xi + 3.0 * xi * xi,
    ]
}

/// Second derivatives d²/dx² of the cubic Hermite functions at `xi = x / L`
pub(crate) fn hermite_curvatures(xi: f64, length: f64) -> [f64; 4] {
    [
        (-6.0 + 12.0 * xi) / (length * length),
        (-4.0 + 6.0 * xi) / length,
        (6.0 - 12.0 * xi) / (length * length),
        (-2.0 + 6.0 * xi) / length,
    ]
}

pub(crate) fn integration_rule(points: usize) -> FEAResult<Vec<(f64, f64)>> {
    gauss_points(points).ok_or_else(|| {
        FEAError::InvalidInput(format!(
            "integration points must be between 1 and 4, got {}",
            points
        ))
    })
}

pub(crate) fn check_station(xi: f64) -> FEAResult<()> {
    if !(0.0..=1.0).contains(&xi) {
        return Err(FEAError::InvalidInput(format!(
            "station {} outside the element (expected 0..=1)",
            xi
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Beam2D {
    core: ElementCore,
    config: BeamConfig,
    rule: Vec<(f64, f64)>,
    sections: Vec<Box<dyn Material>>,
}

impl Beam2D {
    /// Create a beam; `section` is copied to every integration point and
    /// must take `[ε0, κ]` strains
    pub fn new(
        i_node: NodeId,
        j_node: NodeId,
        section: &dyn Material,
        config: BeamConfig,
    ) -> FEAResult<Self> {
        expect_strain_size(section, 2, "Beam2D")?;
        let rule = integration_rule(config.integration_points)?;
        let sections = rule.iter().map(|_| section.clone_box()).collect();
        Ok(Self {
            core: ElementCore::new(vec![i_node, j_node]),
            config,
            rule,
            sections,
        })
    }

    pub fn config(&self) -> &BeamConfig {
        &self.config
    }

    fn length(&self, nodes: &[&Node]) -> FEAResult<f64> {
        let xy = self.core.planar_coordinates(nodes, self.kind())?;
        let (dx, dy) = (xy[1][0] - xy[0][0], xy[1][1] - xy[0][1]);
        let length = dx.hypot(dy);
        if length < GEOMETRY_TOLERANCE {
            return Err(FEAError::DegenerateGeometry(format!(
                "beam between {:?} and {:?} has zero length",
                self.core.nodes[0], self.core.nodes[1]
            )));
        }
        if dx <= 0.0 || dy.abs() > 1e-9 * length {
            return Err(FEAError::InvalidInput(
                "Beam2D must run along +x; use Frame2D for inclined members".to_string(),
            ));
        }
        Ok(length)
    }
}

impl Element for Beam2D {
    fn kind(&self) -> ElementKind {
        ElementKind::Beam2D
    }

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn attach(&mut self, dim: usize) -> FEAResult<Vec<DofKind>> {
        require_planar(dim, self.kind())?;
        let kinds = vec![DofKind::Uy, DofKind::Rz];
        self.core.set_dof_kinds(kinds.clone());
        Ok(kinds)
    }

    fn update_state(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        let u = self.core.displacements(nodes)?;
        let length = self.length(nodes)?;

        let mut force = Vector::zeros(4);
        let mut stiffness = Mat::zeros(4, 4);
        for (&(xi, weight), section) in self.rule.iter().zip(self.sections.iter_mut()) {
            let b = Vector::from_row_slice(&hermite_curvatures(xi, length));
            let kappa = b.dot(&u);
            section.set_strain(&[0.0, kappa])?;
            let moment = section.stress()?[1];
            let ei = section.stiffness()?[(1, 1)];

            let dx = weight * length;
            force += &b * (moment * dx);
            stiffness += &b * b.transpose() * (ei * dx);
        }

        self.core.store(force, stiffness);
        Ok(())
    }

    fn equivalent_load(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        self.core.check_nodes(nodes)?;
        if self.core.loads.is_empty() {
            return Ok(Vector::zeros(4));
        }
        let length = self.length(nodes)?;
        let (_, q) = line_load_totals(&self.core.loads);
        Ok(Vector::from_vec(vec![
            q * length / 2.0,
            q * length * length / 12.0,
            q * length / 2.0,
            -q * length * length / 12.0,
        ]))
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        matches!(load, ElementLoad::Distributed { axial, .. } if *axial == 0.0)
    }

    fn materials(&self) -> Vec<&dyn Material> {
        self.sections.iter().map(|s| s.as_ref()).collect()
    }

    fn materials_mut(&mut self) -> Vec<&mut Box<dyn Material>> {
        self.sections.iter_mut().collect()
    }

    fn internal_force(
        &self,
        nodes: &[&Node],
        xi: f64,
        load_factor: f64,
    ) -> FEAResult<InternalForces> {
        check_station(xi)?;
        let length = self.length(nodes)?;
        let scale = load_factor * self.load_factor();
        let end = self.force()? - self.equivalent_load(nodes)? * scale;
        let (_, q) = line_load_totals(&self.core.loads);
        Ok(line_internal_forces([0.0, end[0], end[1]], 0.0, q * scale, xi * length))
    }
}
