//! Loads applied directly to elements

use serde::{Deserialize, Serialize};

use crate::results::InternalForces;

/// Element load in the element's reference frame
///
/// Element loads are reference values: the element load factor and the
/// system load factor both scale them at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementLoad {
    /// Uniform line load on a beam or frame, per unit length, along the
    /// local axis (`axial`) and perpendicular to it (`transverse`)
    Distributed { axial: f64, transverse: f64 },
    /// Uniform traction on a triangle edge `face` (0: nodes 0-1, 1: nodes 1-2,
    /// 2: nodes 2-0); `normal` is positive pulling outward
    Surface { face: usize, normal: f64, shear: f64 },
}

impl ElementLoad {
    /// Uniform transverse line load
    pub fn transverse(q: f64) -> Self {
        Self::Distributed {
            axial: 0.0,
            transverse: q,
        }
    }

    /// Uniform normal pressure on a triangle edge (positive = tension)
    pub fn surface(face: usize, normal: f64) -> Self {
        Self::Surface {
            face,
            normal,
            shear: 0.0,
        }
    }
}

/// Sum of uniform line loads `(p, q)` on a line element
pub(crate) fn line_load_totals(loads: &[ElementLoad]) -> (f64, f64) {
    loads.iter().fold((0.0, 0.0), |(p, q), load| match *load {
        ElementLoad::Distributed { axial, transverse } => (p + axial, q + transverse),
        ElementLoad::Surface { .. } => (p, q),
    })
}

/// Sectional forces at distance `x` from node 1 of a straight line element
///
/// `r1 = [rx, ry, m]` are the local end forces acting on the element at
/// node 1, `p` and `q` the total uniform axial and transverse loads.
pub(crate) fn line_internal_forces(r1: [f64; 3], p: f64, q: f64, x: f64) -> InternalForces {
    InternalForces {
        position: x,
        axial: -r1[0] - p * x,
        shear: r1[1] + q * x,
        moment: -r1[2] + r1[1] * x + 0.5 * q * x * x,
    }
}
