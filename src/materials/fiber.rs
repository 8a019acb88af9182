//! Uniaxial elastic-plastic fiber with linear isotropic hardening

use serde::{Deserialize, Serialize};

use super::{Material, MaterialKind, Response, StateTag, DEFAULT_YIELD_STRESS};
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vector};

/// Parameters of [`Fiber`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiberParams {
    /// Modulus of elasticity
    #[serde(rename = "E")]
    pub e: f64,
    /// Poisson's ratio (unused by the uniaxial law)
    pub nu: f64,
    /// Initial yield stress
    pub fy: f64,
    /// Isotropic hardening modulus
    #[serde(rename = "H")]
    pub hardening: f64,
}

impl Default for FiberParams {
    fn default() -> Self {
        Self {
            e: 1.0,
            nu: 0.0,
            fy: DEFAULT_YIELD_STRESS,
            hardening: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Plastic {
    strain: f64,
    alpha: f64,
}

/// Rate-independent 1D plasticity with a radial return
#[derive(Debug, Clone)]
pub struct Fiber {
    params: FiberParams,
    committed: Plastic,
    trial: Plastic,
    response: Response,
}

impl Fiber {
    pub fn new(params: FiberParams) -> FEAResult<Self> {
        if params.e <= 0.0 || params.fy <= 0.0 || params.hardening < 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "fiber needs E > 0, fy > 0, H >= 0 (got E={}, fy={}, H={})",
                params.e, params.fy, params.hardening
            )));
        }
        Ok(Self {
            params,
            committed: Plastic::default(),
            trial: Plastic::default(),
            response: Response::new(1),
        })
    }

    pub fn params(&self) -> &FiberParams {
        &self.params
    }

    /// Plastic strain of the current trial state
    pub fn plastic_strain(&self) -> f64 {
        self.trial.strain
    }
}

impl Material for Fiber {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Fiber
    }

    fn strain_size(&self) -> usize {
        1
    }

    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()> {
        self.response.check_len(strain, self.kind())?;
        let FiberParams { e, fy, hardening: h, .. } = self.params;
        let eps = strain[0];

        let sigma_trial = e * (eps - self.committed.strain);
        let f = sigma_trial.abs() - (fy + h * self.committed.alpha);

        let (sigma, tangent) = if f <= 0.0 {
            self.trial = self.committed;
            (sigma_trial, e)
        } else {
            let dgamma = f / (e + h);
            let sign = sigma_trial.signum();
            self.trial = Plastic {
                strain: self.committed.strain + dgamma * sign,
                alpha: self.committed.alpha + dgamma,
            };
            (sigma_trial - e * dgamma * sign, e * h / (e + h))
        };

        self.response.store(
            strain,
            Vector::from_element(1, sigma),
            Mat::from_element(1, 1, tangent),
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

    fn commit(&mut self) {
        self.committed = self.trial;
    }

    fn history(&self) -> Vec<f64> {
        vec![self.committed.strain, self.committed.alpha]
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn steel() -> Fiber {
        Fiber::new(FiberParams {
            e: 200.0,
            fy: 1.0,
            hardening: 20.0,
            ..FiberParams::default()
        })
        .unwrap()
    }

    #[test]
    fn test_elastic_below_yield() {
        let mut mat = steel();
        mat.set_strain(&[0.004]).unwrap();
        assert_relative_eq!(mat.stress().unwrap()[0], 0.8);
        assert_relative_eq!(mat.stiffness().unwrap()[(0, 0)], 200.0);
    }

    #[test]
    fn test_yield_and_hardening() {
        let mut mat = steel();
        mat.set_strain(&[0.01]).unwrap();
        // f = 2 - 1, dγ = 1/220
        let dgamma = 1.0 / 220.0;
        assert_relative_eq!(mat.stress().unwrap()[0], 2.0 - 200.0 * dgamma, epsilon = 1e-12);
        assert_relative_eq!(mat.stiffness().unwrap()[(0, 0)], 200.0 * 20.0 / 220.0);
        // stress lies on the hardened yield surface
        assert_relative_eq!(mat.stress().unwrap()[0], 1.0 + 20.0 * dgamma, epsilon = 1e-12);
    }

    #[test]
    fn test_unloading_is_elastic() {
        let mut mat = steel();
        mat.set_strain(&[0.01]).unwrap();
        mat.commit();
        let peak = mat.stress().unwrap()[0];

        mat.set_strain(&[0.009]).unwrap();
        assert_relative_eq!(mat.stiffness().unwrap()[(0, 0)], 200.0);
        assert_relative_eq!(mat.stress().unwrap()[0], peak - 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_trial_does_not_touch_history() {
        let mut mat = steel();
        mat.set_strain(&[0.02]).unwrap();
        assert_eq!(mat.history(), vec![0.0, 0.0]);
        let first = mat.stress().unwrap()[0];
        mat.set_strain(&[0.02]).unwrap();
        assert_eq!(mat.stress().unwrap()[0], first);
        mat.commit();
        assert!(mat.history()[0] > 0.0);
    }

    #[test]
    fn test_invalid_params() {
        assert!(Fiber::new(FiberParams {
            e: -1.0,
            ..FiberParams::default()
        })
        .is_err());
    }
}
