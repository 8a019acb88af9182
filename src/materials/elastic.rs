//! Linear elastic uniaxial material

use serde::{Deserialize, Serialize};

use super::{Material, MaterialKind, Response, StateTag};
use crate::error::FEAResult;
use crate::math::{Mat, Vector};

/// Parameters of [`Elastic`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticParams {
    /// Modulus of elasticity
    #[serde(rename = "E")]
    pub e: f64,
    /// Poisson's ratio (informational for uniaxial use)
    pub nu: f64,
}

impl Default for ElasticParams {
    fn default() -> Self {
        Self { e: 1.0, nu: 0.0 }
    }
}

/// σ = E·ε
#[derive(Debug, Clone)]
pub struct Elastic {
    params: ElasticParams,
    response: Response,
}

impl Elastic {
    pub fn new(params: ElasticParams) -> Self {
        Self {
            params,
            response: Response::new(1),
        }
    }

    /// Elastic material with modulus `e`
    pub fn with_modulus(e: f64) -> Self {
        Self::new(ElasticParams {
            e,
            ..ElasticParams::default()
        })
    }

    pub fn params(&self) -> &ElasticParams {
        &self.params
    }
}

impl Material for Elastic {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Elastic
    }

    fn strain_size(&self) -> usize {
        1
    }

    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()> {
        self.response.check_len(strain, self.kind())?;
        let e = self.params.e;
        self.response.store(
            strain,
            Vector::from_element(1, e * strain[0]),
            Mat::from_element(1, 1, e),
        );
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
