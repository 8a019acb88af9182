//! Linear elastic plane stress

use serde::{Deserialize, Serialize};

use super::{Material, MaterialKind, Response, StateTag, DEFAULT_YIELD_STRESS};
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vector};

/// Parameters shared by the 2D continuum materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaneParams {
    /// Modulus of elasticity
    #[serde(rename = "E")]
    pub e: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Initial yield stress (plane strain only)
    pub fy: f64,
    /// Isotropic hardening modulus (plane strain only)
    #[serde(rename = "H")]
    pub hardening: f64,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            e: 1.0,
            nu: 0.3,
            fy: DEFAULT_YIELD_STRESS,
            hardening: 0.0,
        }
    }
}

impl PlaneParams {
    pub(crate) fn validate(&self) -> FEAResult<()> {
        if self.e <= 0.0 || self.nu <= -1.0 || self.nu >= 0.5 {
            return Err(FEAError::InvalidInput(format!(
                "plane material needs E > 0 and -1 < nu < 0.5 (got E={}, nu={})",
                self.e, self.nu
            )));
        }
        if self.fy <= 0.0 || self.hardening < 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "plane material needs fy > 0 and H >= 0 (got fy={}, H={})",
                self.fy, self.hardening
            )));
        }
        Ok(())
    }
}

/// Isotropic elastic material under plane stress, strain `[εxx, εyy, γxy]`
#[derive(Debug, Clone)]
pub struct PlaneStress {
    params: PlaneParams,
    elasticity: Mat,
    response: Response,
}

impl PlaneStress {
    pub fn new(params: PlaneParams) -> FEAResult<Self> {
        params.validate()?;
        if params.fy != DEFAULT_YIELD_STRESS || params.hardening != 0.0 {
            return Err(FEAError::Unsupported(
                "plane stress material is elastic; use plane strain for plasticity".to_string(),
            ));
        }
        let (e, nu) = (params.e, params.nu);
        let factor = e / (1.0 - nu * nu);
        #[rustfmt::skip]
        let elasticity = Mat::from_row_slice(3, 3, &[
            factor, factor * nu, 0.0,
            factor * nu, factor, 0.0,
            0.0, 0.0, factor * (1.0 - nu) / 2.0,
        ]);
        Ok(Self {
            params,
            elasticity,
            response: Response::new(3),
        })
    }

    pub fn params(&self) -> &PlaneParams {
        &self.params
    }
}

impl Material for PlaneStress {
    fn kind(&self) -> MaterialKind {
        MaterialKind::PlaneStress
    }

    fn strain_size(&self) -> usize {
        3
    }

    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()> {
        self.response.check_len(strain, self.kind())?;
        let stress = &self.elasticity * Vector::from_column_slice(strain);
        self.response.store(strain, stress, self.elasticity.clone());
        Ok(())
    }

    fn strain(&self) -> FEAResult<&Vector> {
        self.response.strain()
    }

    fn stress(&self) -> FEAResult<&Vector> {
        self.response.stress()
    }

    fn stiffness(&self) -> FEAResult<&Mat> {
        self.response.tangent()
    }

    fn state(&self) -> StateTag {
        self.response.tag()
    }

    fn commit(&mut self) {}

    fn history(&self) -> Vec<f64> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}
