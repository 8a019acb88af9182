//! Nodal coordinate transformations for skewed supports
//!
//! A transformation attached to a node makes that node's DOFs, fixity,
//! loads and reported displacements refer to a rotated local frame.
//! Elements always work in the global frame; assembly maps between them.

use nalgebra::Matrix3;

use super::DofKind;
use crate::error::{FEAError, FEAResult};
use crate::math::Mat;

/// Rotation from global to a node-local frame: `v_local = R * v_global`
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    rotation: Matrix3<f64>,
}

impl Transformation {
    /// In-plane rotation: the local x-axis is the global x-axis rotated by
    /// `angle` (radians, counter-clockwise) about z
    pub fn planar(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let rotation = Matrix3::new(
            c, s, 0.0,
            -s, c, 0.0,
            0.0, 0.0, 1.0,
        );
        Self { rotation }
    }

    /// Build from a rotation matrix whose rows are the local axes expressed
    /// in global coordinates
    pub fn from_rotation(rotation: Matrix3<f64>) -> FEAResult<Self> {
        let should_be_identity = rotation * rotation.transpose();
        if (should_be_identity - Matrix3::identity()).amax() > 1e-9 {
            return Err(FEAError::InvalidInput(
                "transformation matrix is not orthonormal".to_string(),
            ));
        }
        Ok(Self { rotation })
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Rotation block acting on the listed DOFs: `u_local = B * u_global`
    ///
    /// Translations mix only with translations and rotations only with
    /// rotations. Fails when the rotation couples a listed DOF to one that
    /// is missing from the list, since the block would then drop components.
    pub fn block(&self, kinds: &[DofKind]) -> FEAResult<Mat> {
        let n = kinds.len();
        let mut b = Mat::zeros(n, n);
        for (i, ki) in kinds.iter().enumerate() {
            let mut row_norm = 0.0;
            for (j, kj) in kinds.iter().enumerate() {
                if ki.is_translation() == kj.is_translation() {
                    let r = self.rotation[(ki.axis(), kj.axis())];
                    b[(i, j)] = r;
                    row_norm += r * r;
                }
            }
            if (row_norm - 1.0).abs() > 1e-9 {
                return Err(FEAError::InvalidInput(format!(
                    "transformation couples {} to a DOF that is not present",
                    ki
                )));
            }
        }
        Ok(b)
    }
}
