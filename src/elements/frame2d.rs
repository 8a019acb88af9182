//! Two-node plane frame element with axial, bending and optional
//! von Kármán (moderate rotation) coupling
//!
//! Local DOFs are `[u, w, θ]` per node, related to the global
//! `[ux, uy, rz]` by the element rotation. Each Gauss point owns a section
//! material receiving `[ε0, κ]` with
//!
//! ```text
//! ε0 = u' (+ ½ w'² for finite kinematics),   κ = w''
//! ```

use serde::{Deserialize, Serialize};

use super::beam2d::{check_station, hermite_curvatures, hermite_slopes, integration_rule};
use super::loads::{line_internal_forces, line_load_totals};
use super::{require_planar, Element, ElementCore, ElementKind, ElementLoad, Kinematics};
use crate::domain::{DofKind, Node, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::materials::{expect_strain_size, Material};
use crate::math::{frame_transformation_2d, Mat, Vector};
use crate::results::InternalForces;

/// Frame configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Gauss points along the axis (1 to 4)
    pub integration_points: usize,
    /// Strain measure
    pub kinematics: Kinematics,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            integration_points: 3,
            kinematics: Kinematics::Linear,
        }
    }
}

impl FrameConfig {
    /// Include the von Kármán axial strain and geometric stiffness
    pub fn finite(mut self) -> Self {
        self.kinematics = Kinematics::Finite;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Frame2D {
    core: ElementCore,
    config: FrameConfig,
    rule: Vec<(f64, f64)>,
    sections: Vec<Box<dyn Material>>,
}

impl Frame2D {
    /// Create a frame; `section` is copied to every integration point
    pub fn new(
        i_node: NodeId,
        j_node: NodeId,
        section: &dyn Material,
        config: FrameConfig,
    ) -> FEAResult<Self> {
        expect_strain_size(section, 2, "Frame2D")?;
        let rule = integration_rule(config.integration_points)?;
        let sections = rule.iter().map(|_| section.clone_box()).collect();
        Ok(Self {
            core: ElementCore::new(vec![i_node, j_node]),
            config,
            rule,
            sections,
        })
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Rotation from global to local DOFs and the element length
    fn geometry(&self, nodes: &[&Node]) -> FEAResult<(Mat, f64)> {
        let xy = self.core.planar_coordinates(nodes, self.kind())?;
        frame_transformation_2d(&xy[0], &xy[1]).ok_or_else(|| {
            FEAError::DegenerateGeometry(format!(
                "frame between {:?} and {:?} has zero length",
                self.core.nodes[0], self.core.nodes[1]
            ))
        })
    }

    /// Section forces `[N, M]` at every integration point
    pub fn section_forces(&self) -> FEAResult<Vec<[f64; 2]>> {
        self.sections
            .iter()
            .map(|s| {
                let r = s.stress()?;
                Ok([r[0], r[1]])
            })
            .collect()
    }

    fn local_equivalent_load(&self, length: f64) -> Vector {
        let (p, q) = line_load_totals(&self.core.loads);
        Vector::from_vec(vec![
            p * length / 2.0,
            q * length / 2.0,
            q * length * length / 12.0,
            p * length / 2.0,
            q * length / 2.0,
            -q * length * length / 12.0,
        ])
    }
}

impl Element for Frame2D {
    fn kind(&self) -> ElementKind {
        ElementKind::Frame2D
    }

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn attach(&mut self, dim: usize) -> FEAResult<Vec<DofKind>> {
        require_planar(dim, self.kind())?;
        let kinds = vec![DofKind::Ux, DofKind::Uy, DofKind::Rz];
        self.core.set_dof_kinds(kinds.clone());
        Ok(kinds)
    }

    fn update_state(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        let u_global = self.core.displacements(nodes)?;
        let (t, length) = self.geometry(nodes)?;
        let u = &t * u_global;
        let finite = self.config.kinematics == Kinematics::Finite;

        let mut bu = Vector::zeros(6);
        bu[0] = -1.0 / length;
        bu[3] = 1.0 / length;

        let mut force = Vector::zeros(6);
        let mut stiffness = Mat::zeros(6, 6);
        for (&(xi, weight), section) in self.rule.iter().zip(self.sections.iter_mut()) {
            let slopes = hermite_slopes(xi, length);
            let curvatures = hermite_curvatures(xi, length);
            let mut g = Vector::zeros(6);
            let mut bk = Vector::zeros(6);
            for (a, &i) in [1usize, 2, 4, 5].iter().enumerate() {
                g[i] = slopes[a];
                bk[i] = curvatures[a];
            }

            let (eps0, be) = if finite {
                let w_slope = g.dot(&u);
                (bu.dot(&u) + 0.5 * w_slope * w_slope, &bu + &g * w_slope)
            } else {
                (bu.dot(&u), bu.clone())
            };
            let kappa = bk.dot(&u);

            section.set_strain(&[eps0, kappa])?;
            let s = section.stress()?;
            let (axial, moment) = (s[0], s[1]);
            let c = section.stiffness()?;

            let mut b = Mat::zeros(2, 6);
            b.row_mut(0).copy_from(&be.transpose());
            b.row_mut(1).copy_from(&bk.transpose());

            let dx = weight * length;
            force += (&be * axial + &bk * moment) * dx;
            stiffness += b.transpose() * c * &b * dx;
            if finite {
                stiffness += &g * g.transpose() * (axial * dx);
            }
        }

        let tt = t.transpose();
        self.core.store(&tt * force, &tt * stiffness * &t);
        Ok(())
    }

    fn equivalent_load(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        self.core.check_nodes(nodes)?;
        if self.core.loads.is_empty() {
            return Ok(Vector::zeros(6));
        }
        let (t, length) = self.geometry(nodes)?;
        Ok(t.transpose() * self.local_equivalent_load(length))
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        matches!(load, ElementLoad::Distributed { .. })
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
        let (t, length) = self.geometry(nodes)?;
        let scale = load_factor * self.load_factor();
        let end = &t * self.force()? - self.local_equivalent_load(length) * scale;
        let (p, q) = line_load_totals(&self.core.loads);
        Ok(line_internal_forces(
            [end[0], end[1], end[2]],
            p * scale,
            q * scale,
            xi * length,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{SectionMaterial, SectionParams};
    use crate::math::is_symmetric;
    use approx::assert_relative_eq;

    const KINDS: [DofKind; 3] = [DofKind::Ux, DofKind::Uy, DofKind::Rz];

    fn frame(end: [f64; 2], config: FrameConfig) -> (Node, Node, Frame2D) {
        let a = Node::new(0.0, 0.0).with_dofs(&KINDS);
        let b = Node::new(end[0], end[1]).with_dofs(&KINDS);
        let section = SectionMaterial::elastic(SectionParams {
            e: 100.0,
            area: 0.5,
            inertia: 0.02,
        })
        .unwrap();
        let mut f = Frame2D::new(NodeId(0), NodeId(1), &section, config).unwrap();
        f.attach(2).unwrap();
        (a, b, f)
    }

    #[test]
    fn test_horizontal_stiffness_terms() {
        let (a, b, mut f) = frame([2.0, 0.0], FrameConfig::default());
        f.update_state(&[&a, &b]).unwrap();
        let k = f.stiffness().unwrap();
        // EA/L = 25, EI = 2
        assert_relative_eq!(k[(0, 0)], 25.0, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 3)], -25.0, epsilon = 1e-12);
        assert_relative_eq!(k[(1, 1)], 12.0 * 2.0 / 8.0, epsilon = 1e-12);
        assert_relative_eq!(k[(2, 2)], 4.0 * 2.0 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_member_axial_load() {
        let (a, mut b, mut f) = frame([0.0, 3.0], FrameConfig::default());
        // EA/L = 50/3, shorten by 0.03
        b.set_disp(&[0.0, -0.03, 0.0], &KINDS).unwrap();
        f.update_state(&[&a, &b]).unwrap();
        let force = f.force().unwrap();
        assert_relative_eq!(force[4], -0.5, epsilon = 1e-12);
        assert_relative_eq!(force[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(f.section_forces().unwrap()[0][0], -0.5, epsilon = 1e-12);
        assert!(is_symmetric(f.stiffness().unwrap(), 1e-12));
    }

    #[test]
    fn test_finite_tangent_matches_finite_difference() {
        let (a, mut b, mut f) = frame([2.0, 0.5], FrameConfig::default().finite());
        let base = [0.01, 0.2, 0.1];
        b.set_disp(&base, &KINDS).unwrap();
        f.update_state(&[&a, &b]).unwrap();
        let k = f.stiffness().unwrap().clone();
        let f0 = f.force().unwrap().clone();
        assert!(is_symmetric(&k, 1e-10));

        let h = 1e-7;
        for j in 0..3 {
            let mut u = base;
            u[j] += h;
            b.set_disp(&u, &KINDS).unwrap();
            f.update_state(&[&a, &b]).unwrap();
            let df = (f.force().unwrap() - &f0) / h;
            for i in 0..6 {
                assert_relative_eq!(df[i], k[(i, 3 + j)], epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_uniform_load_fixed_end_moments() {
        let (a, b, mut f) = frame([4.0, 0.0], FrameConfig::default());
        f.add_load(ElementLoad::Distributed {
            axial: 1.0,
            transverse: -3.0,
        })
        .unwrap();
        f.update_state(&[&a, &b]).unwrap();
        let eq = f.equivalent_load(&[&a, &b]).unwrap();
        assert_relative_eq!(eq[0], 2.0);
        assert_relative_eq!(eq[1], -6.0);
        assert_relative_eq!(eq[2], -4.0);
        assert_relative_eq!(eq[5], 4.0);

        // both ends clamped, zero displacement: the fixed-end forces balance the load
        let mid = f.internal_force(&[&a, &b], 0.5, 1.0).unwrap();
        assert_relative_eq!(mid.moment, 3.0 * 16.0 / 24.0, epsilon = 1e-12);
        assert_relative_eq!(mid.shear, 0.0, epsilon = 1e-12);
        let start = f.internal_force(&[&a, &b], 0.0, 1.0).unwrap();
        assert_relative_eq!(start.moment, -3.0 * 16.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(start.axial, 2.0, epsilon = 1e-12);
    }
}
