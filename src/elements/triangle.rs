//! Constant-strain triangle for plane problems
//!
//! With finite kinematics the element is total Lagrangian: Green-Lagrange
//! strain `E = ½(FᵀF − I)` drives the material, whose stress is taken as
//! the second Piola-Kirchhoff stress `S`.

use serde::{Deserialize, Serialize};

use super::{require_planar, Element, ElementCore, ElementKind, ElementLoad, Kinematics};
use crate::domain::{DofKind, Node, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::materials::{expect_strain_size, Material};
use crate::math::{Mat, Mat2, Vector, GEOMETRY_TOLERANCE};

/// Triangle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriangleConfig {
    /// Out-of-plane thickness
    #[serde(rename = "t")]
    pub thickness: f64,
    /// Strain measure
    pub kinematics: Kinematics,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            thickness: 1.0,
            kinematics: Kinematics::Linear,
        }
    }
}

impl TriangleConfig {
    pub fn finite(mut self) -> Self {
        self.kinematics = Kinematics::Finite;
        self
    }
}

/// Reference area and shape-function gradients `[∂N/∂X, ∂N/∂Y]` per node
struct Shape {
    area: f64,
    gradients: [[f64; 2]; 3],
}

#[derive(Debug, Clone)]
pub struct LinearTriangle {
    core: ElementCore,
    config: TriangleConfig,
    material: Box<dyn Material>,
}

impl LinearTriangle {
    /// Nodes must be listed counter-clockwise
    pub fn new(
        nodes: [NodeId; 3],
        material: Box<dyn Material>,
        config: TriangleConfig,
    ) -> FEAResult<Self> {
        expect_strain_size(material.as_ref(), 3, "LinearTriangle")?;
        if config.thickness <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "triangle thickness must be positive, got {}",
                config.thickness
            )));
        }
        Ok(Self {
            core: ElementCore::new(nodes.to_vec()),
            config,
            material,
        })
    }

    pub fn config(&self) -> &TriangleConfig {
        &self.config
    }

    /// Material stress `[σxx, σyy, σxy]` (second Piola-Kirchhoff for
    /// finite kinematics)
    pub fn stress(&self) -> FEAResult<&Vector> {
        self.material.stress()
    }

    fn shape(&self, nodes: &[&Node]) -> FEAResult<Shape> {
        let x = self.core.planar_coordinates(nodes, self.kind())?;
        let twice_area = (x[1][0] - x[0][0]) * (x[2][1] - x[0][1])
            - (x[2][0] - x[0][0]) * (x[1][1] - x[0][1]);
        if twice_area <= 2.0 * GEOMETRY_TOLERANCE {
            return Err(FEAError::DegenerateGeometry(format!(
                "triangle {:?} has non-positive area (nodes must be counter-clockwise)",
                self.core.nodes
            )));
        }
        let mut gradients = [[0.0; 2]; 3];
        for i in 0..3 {
            let j = (i + 1) % 3;
            let k = (i + 2) % 3;
            gradients[i] = [
                (x[j][1] - x[k][1]) / twice_area,
                (x[k][0] - x[j][0]) / twice_area,
            ];
        }
        Ok(Shape {
            area: 0.5 * twice_area,
            gradients,
        })
    }
}

impl Element for LinearTriangle {
    fn kind(&self) -> ElementKind {
        ElementKind::LinearTriangle
    }

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn attach(&mut self, dim: usize) -> FEAResult<Vec<DofKind>> {
        require_planar(dim, self.kind())?;
        let kinds = vec![DofKind::Ux, DofKind::Uy];
        self.core.set_dof_kinds(kinds.clone());
        Ok(kinds)
    }

    fn update_state(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        let u = self.core.displacements(nodes)?;
        let shape = self.shape(nodes)?;
        let finite = self.config.kinematics == Kinematics::Finite;
        let volume = shape.area * self.config.thickness;

        // displacement gradient H[a][b] = ∂u_a/∂X_b
        let mut h = Mat2::zeros();
        for (i, dn) in shape.gradients.iter().enumerate() {
            for a in 0..2 {
                for b in 0..2 {
                    h[(a, b)] += u[2 * i + a] * dn[b];
                }
            }
        }
        let f = if finite { Mat2::identity() + h } else { Mat2::identity() };

        let strain = if finite {
            let e = 0.5 * (h + h.transpose() + h.transpose() * h);
            [e[(0, 0)], e[(1, 1)], 2.0 * e[(0, 1)]]
        } else {
            [h[(0, 0)], h[(1, 1)], h[(0, 1)] + h[(1, 0)]]
        };

        let mut b = Mat::zeros(3, 6);
        for (i, dn) in shape.gradients.iter().enumerate() {
            for a in 0..2 {
                let col = 2 * i + a;
                b[(0, col)] = f[(a, 0)] * dn[0];
                b[(1, col)] = f[(a, 1)] * dn[1];
                b[(2, col)] = f[(a, 0)] * dn[1] + f[(a, 1)] * dn[0];
            }
        }

        self.material.set_strain(&strain)?;
        let stress = self.material.stress()?.clone();
        let c = self.material.stiffness()?;

        let force = b.transpose() * &stress * volume;
        let mut stiffness = b.transpose() * c * &b * volume;

        if finite {
            let s = Mat2::new(stress[0], stress[2], stress[2], stress[1]);
            for (i, gi) in shape.gradients.iter().enumerate() {
                for (j, gj) in shape.gradients.iter().enumerate() {
                    let gi = nalgebra::Vector2::new(gi[0], gi[1]);
                    let gj = nalgebra::Vector2::new(gj[0], gj[1]);
                    let kg = gi.dot(&(s * gj)) * volume;
                    for a in 0..2 {
                        stiffness[(2 * i + a, 2 * j + a)] += kg;
                    }
                }
            }
        }

        self.core.store(force, stiffness);
        Ok(())
    }

    fn equivalent_load(&self, nodes: &[&Node]) -> FEAResult<Vector> {
        self.core.check_nodes(nodes)?;
        let mut loads = Vector::zeros(6);
        if self.core.loads.is_empty() {
            return Ok(loads);
        }
        let x = self.core.planar_coordinates(nodes, self.kind())?;
        let t = self.config.thickness;
        for load in &self.core.loads {
            if let ElementLoad::Surface { face, normal, shear } = *load {
                let (i, j) = (face, (face + 1) % 3);
                let tangent = [x[j][0] - x[i][0], x[j][1] - x[i][1]];
                let outward = [tangent[1], -tangent[0]];
                for a in 0..2 {
                    let p = 0.5 * t * (normal * outward[a] + shear * tangent[a]);
                    loads[2 * i + a] += p;
                    loads[2 * j + a] += p;
                }
            }
        }
        Ok(loads)
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        matches!(load, ElementLoad::Surface { face, .. } if *face < 3)
    }

    fn materials(&self) -> Vec<&dyn Material> {
        vec![self.material.as_ref()]
    }

    fn materials_mut(&mut self) -> Vec<&mut Box<dyn Material>> {
        vec![&mut self.material]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::{PlaneParams, PlaneStrain, PlaneStress};
    use crate::math::is_symmetric;
    use approx::assert_relative_eq;

    const KINDS: [DofKind; 2] = [DofKind::Ux, DofKind::Uy];

    fn nodes() -> [Node; 3] {
        [
            Node::new(0.0, 0.0).with_dofs(&KINDS),
            Node::new(2.0, 0.0).with_dofs(&KINDS),
            Node::new(0.0, 1.0).with_dofs(&KINDS),
        ]
    }

    fn triangle(config: TriangleConfig) -> LinearTriangle {
        let material = PlaneStress::new(PlaneParams {
            e: 100.0,
            nu: 0.25,
            ..PlaneParams::default()
        })
        .unwrap();
        let ids = [NodeId(0), NodeId(1), NodeId(2)];
        let mut t = LinearTriangle::new(ids, Box::new(material), config).unwrap();
        t.attach(2).unwrap();
        t
    }

    fn refs(n: &[Node; 3]) -> [&Node; 3] {
        [&n[0], &n[1], &n[2]]
    }

    #[test]
    fn test_short_node_slice_is_rejected() {
        let n = nodes();
        let mut t = triangle(TriangleConfig::default());
        t.add_load(ElementLoad::surface(0, 1.0)).unwrap();
        assert!(matches!(t.equivalent_load(&[&n[0], &n[1]]), Err(FEAError::InvalidInput(_))));
        assert!(matches!(t.update_state(&[&n[0]]), Err(FEAError::InvalidInput(_))));
        assert!(t.equivalent_load(&refs(&n)).is_ok());
    }

    #[test]
    fn test_uniform_strain_field() {
        let mut n = nodes();
        // u = 0.01 x everywhere
        n[1].set_disp(&[0.02, 0.0], &KINDS).unwrap();
        let mut t = triangle(TriangleConfig::default());
        t.update_state(&refs(&n)).unwrap();
        let strain = t.materials()[0].strain().unwrap().clone();
        assert_relative_eq!(strain[0], 0.01, epsilon = 1e-14);
        assert_relative_eq!(strain[1], 0.0, epsilon = 1e-14);
        assert!(is_symmetric(t.stiffness().unwrap(), 1e-12));
        // internal forces are self-equilibrated
        let f = t.force().unwrap();
        assert_relative_eq!(f[0] + f[2] + f[4], 0.0, epsilon = 1e-12);
        assert_relative_eq!(f[1] + f[3] + f[5], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rigid_rotation() {
        let mut n = nodes();
        let angle: f64 = 0.5;
        let (s, c) = angle.sin_cos();
        for node in n.iter_mut() {
            let p = node.position().to_vec();
            let moved = [c * p[0] - s * p[1] - p[0], s * p[0] + c * p[1] - p[1]];
            node.set_disp(&moved, &KINDS).unwrap();
        }
        let mut finite = triangle(TriangleConfig::default().finite());
        finite.update_state(&refs(&n)).unwrap();
        assert_relative_eq!(finite.force().unwrap().norm(), 0.0, epsilon = 1e-12);

        let mut linear = triangle(TriangleConfig::default());
        linear.update_state(&refs(&n)).unwrap();
        assert!(linear.force().unwrap().norm() > 1.0);
    }

    #[test]
    fn test_finite_tangent_matches_finite_difference() {
        let mut n = nodes();
        let material = PlaneStrain::new(PlaneParams {
            e: 100.0,
            nu: 0.3,
            ..PlaneParams::default()
        })
        .unwrap();
        let mut t = LinearTriangle::new(
            [NodeId(0), NodeId(1), NodeId(2)],
            Box::new(material),
            TriangleConfig::default().finite(),
        )
        .unwrap();
        t.attach(2).unwrap();

        let base = [[0.0, 0.0], [0.1, 0.05], [-0.08, 0.12]];
        for (node, u) in n.iter_mut().zip(base.iter()) {
            node.set_disp(u, &KINDS).unwrap();
        }
        t.update_state(&refs(&n)).unwrap();
        let k = t.stiffness().unwrap().clone();
        let f0 = t.force().unwrap().clone();
        assert!(is_symmetric(&k, 1e-10));

        let h = 1e-7;
        for (node, comp) in [(1usize, 0usize), (1, 1), (2, 0), (2, 1)] {
            let mut u = base[node];
            u[comp] += h;
            n[node].set_disp(&u, &KINDS).unwrap();
            t.update_state(&refs(&n)).unwrap();
            n[node].set_disp(&base[node], &KINDS).unwrap();
            let df = (t.force().unwrap() - &f0) / h;
            for i in 0..6 {
                let column = 2 * node + comp;
                assert_relative_eq!(df[i], k[(i, column)], epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_clockwise_is_degenerate() {
        let n = nodes();
        let mut t = triangle(TriangleConfig::default());
        let err = t.update_state(&[&n[0], &n[2], &n[1]]).unwrap_err();
        assert!(matches!(err, FEAError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_surface_load_on_edge() {
        let n = nodes();
        let mut t = triangle(TriangleConfig {
            thickness: 0.5,
            ..TriangleConfig::default()
        });
        // edge 0 runs from (0,0) to (2,0); outward normal is -y
        t.add_load(ElementLoad::surface(0, 4.0)).unwrap();
        let p = t.equivalent_load(&refs(&n)).unwrap();
        assert_relative_eq!(p[1], -2.0);
        assert_relative_eq!(p[3], -2.0);
        assert_relative_eq!(p[0], 0.0);
        assert_relative_eq!(p[5], 0.0);
        assert!(t.add_load(ElementLoad::surface(3, 1.0)).is_err());
    }
}
