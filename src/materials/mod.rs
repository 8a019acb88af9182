//! Constitutive models
//!
//! A material maps a strain vector to stress and tangent modulus. Every
//! query refers to the strain set by the most recent [`Material::set_strain`]
//! call. Inelastic materials compute that trial state from their committed
//! history; [`Material::commit`] promotes the trial history once a load step
//! has converged, so repeating `set_strain` with the same input is
//! idempotent.

pub mod elastic;
pub mod fiber;
pub mod plane_strain;
pub mod plane_stress;
pub mod section;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vector};

pub use elastic::{Elastic, ElasticParams};
pub use fiber::{Fiber, FiberParams};
pub use plane_strain::PlaneStrain;
pub use plane_stress::{PlaneParams, PlaneStress};
pub use section::{SectionMaterial, SectionParams};

/// Yield stress used when none is given; large enough that nothing yields
pub const DEFAULT_YIELD_STRESS: f64 = 1.0e12;

/// Whether a material/element has been evaluated at least once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateTag {
    Uninitialized,
    Updated,
}

/// Type tag of a material variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    Elastic,
    Fiber,
    PlaneStress,
    PlaneStrain,
    Section,
}

/// Constitutive law interface
pub trait Material: fmt::Debug {
    fn kind(&self) -> MaterialKind;

    /// Length of the strain vector: 1 (uniaxial), 2 (section: axial strain
    /// and curvature) or 3 (plane: εxx, εyy, γxy)
    fn strain_size(&self) -> usize;

    /// Evaluate stress and tangent for a new trial strain
    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()>;

    fn strain(&self) -> FEAResult<&Vector>;

    fn stress(&self) -> FEAResult<&Vector>;

    fn stiffness(&self) -> FEAResult<&Mat>;

    fn state(&self) -> StateTag;

    /// Accept the current trial state as the new committed history
    fn commit(&mut self);

    /// Committed internal variables (empty for elastic materials)
    fn history(&self) -> Vec<f64>;

    fn clone_box(&self) -> Box<dyn Material>;
}

impl Clone for Box<dyn Material> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Last evaluated strain, stress and tangent of a material
#[derive(Debug, Clone)]
pub(crate) struct Response {
    tag: StateTag,
    strain: Vector,
    stress: Vector,
    tangent: Mat,
}

impl Response {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            tag: StateTag::Uninitialized,
            strain: Vector::zeros(size),
            stress: Vector::zeros(size),
            tangent: Mat::zeros(size, size),
        }
    }

    pub(crate) fn check_len(&self, strain: &[f64], kind: MaterialKind) -> FEAResult<()> {
        if strain.len() != self.strain.len() {
            return Err(FEAError::InvalidInput(format!(
                "{:?} material expects {} strain components, got {}",
                kind,
                self.strain.len(),
                strain.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn store(&mut self, strain: &[f64], stress: Vector, tangent: Mat) {
        self.strain.copy_from_slice(strain);
        self.stress = stress;
        self.tangent = tangent;
        self.tag = StateTag::Updated;
    }

    fn ready(&self, what: &str) -> FEAResult<()> {
        match self.tag {
            StateTag::Updated => Ok(()),
            StateTag::Uninitialized => Err(FEAError::UninitializedState(format!(
                "material {}",
                what
            ))),
        }
    }

    pub(crate) fn strain(&self) -> FEAResult<&Vector> {
        self.ready("strain")?;
        Ok(&self.strain)
    }

    pub(crate) fn stress(&self) -> FEAResult<&Vector> {
        self.ready("stress")?;
        Ok(&self.stress)
    }

    pub(crate) fn tangent(&self) -> FEAResult<&Mat> {
        self.ready("stiffness")?;
        Ok(&self.tangent)
    }

    pub(crate) fn tag(&self) -> StateTag {
        self.tag
    }
}

/// Fail unless a material has the expected strain size
pub(crate) fn expect_strain_size(
    material: &dyn Material,
    size: usize,
    owner: &str,
) -> FEAResult<()> {
    if material.strain_size() != size {
        return Err(FEAError::InvalidInput(format!(
            "{} needs a material with {} strain components, {:?} has {}",
            owner,
            size,
            material.kind(),
            material.strain_size()
        )));
    }
    Ok(())
}
