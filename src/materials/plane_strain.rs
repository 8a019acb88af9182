//! J2 (von Mises) plasticity under plane strain
//!
//! Strain input is `[εxx, εyy, γxy]` with εzz = 0. The out-of-plane stress
//! is tracked internally and reported by [`PlaneStrain::stress_zz`].

use super::{Material, MaterialKind, PlaneParams, Response, StateTag};
use crate::error::FEAResult;
use crate::math::{Mat, Vector};

/// Plastic strain tensor components (xx, yy, zz, xy) and equivalent plastic strain
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Plastic {
    strain: [f64; 4],
    alpha: f64,
}

#[derive(Debug, Clone)]
pub struct PlaneStrain {
    params: PlaneParams,
    bulk: f64,
    shear: f64,
    committed: Plastic,
    trial: Plastic,
    stress_zz: f64,
    response: Response,
}

impl PlaneStrain {
    pub fn new(params: PlaneParams) -> FEAResult<Self> {
        params.validate()?;
        let bulk = params.e / (3.0 * (1.0 - 2.0 * params.nu));
        let shear = params.e / (2.0 * (1.0 + params.nu));
        Ok(Self {
            params,
            bulk,
            shear,
            committed: Plastic::default(),
            trial: Plastic::default(),
            stress_zz: 0.0,
            response: Response::new(3),
        })
    }

    pub fn params(&self) -> &PlaneParams {
        &self.params
    }

    /// Out-of-plane normal stress of the current trial state
    pub fn stress_zz(&self) -> f64 {
        self.stress_zz
    }

    /// Equivalent plastic strain of the current trial state
    pub fn equivalent_plastic_strain(&self) -> f64 {
        self.trial.alpha
    }

    fn elastic_tangent(&self) -> Mat {
        let (k, mu) = (self.bulk, self.shear);
        let c11 = k + 4.0 * mu / 3.0;
        let c12 = k - 2.0 * mu / 3.0;
        Mat::from_row_slice(3, 3, &[c11, c12, 0.0, c12, c11, 0.0, 0.0, 0.0, mu])
    }
}

impl Material for PlaneStrain {
    fn kind(&self) -> MaterialKind {
        MaterialKind::PlaneStrain
    }

    fn strain_size(&self) -> usize {
        3
    }

    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()> {
        self.response.check_len(strain, self.kind())?;
        let (k, mu, h) = (self.bulk, self.shear, self.params.hardening);
        let ep = self.committed.strain;

        // elastic strain tensor, engineering shear halved
        let e = [
            strain[0] - ep[0],
            strain[1] - ep[1],
            -ep[2],
            0.5 * strain[2] - ep[3],
        ];
        let vol = e[0] + e[1] + e[2];
        let s_trial = [
            2.0 * mu * (e[0] - vol / 3.0),
            2.0 * mu * (e[1] - vol / 3.0),
            2.0 * mu * (e[2] - vol / 3.0),
            2.0 * mu * e[3],
        ];
        let s_norm = (s_trial[0].powi(2)
            + s_trial[1].powi(2)
            + s_trial[2].powi(2)
            + 2.0 * s_trial[3].powi(2))
        .sqrt();

        let radius = (2.0f64 / 3.0).sqrt() * (self.params.fy + h * self.committed.alpha);
        let f = s_norm - radius;
        let p = k * vol;

        if f <= 0.0 {
            self.trial = self.committed;
            self.stress_zz = p + s_trial[2];
            let stress = Vector::from_vec(vec![p + s_trial[0], p + s_trial[1], s_trial[3]]);
            let tangent = self.elastic_tangent();
            self.response.store(strain, stress, tangent);
            return Ok(());
        }

        let dgamma = f / (2.0 * mu + 2.0 * h / 3.0);
        let n = s_trial.map(|s| s / s_norm);
        let s = [0, 1, 2, 3].map(|i| s_trial[i] - 2.0 * mu * dgamma * n[i]);

        let mut plastic = self.committed;
        for i in 0..4 {
            plastic.strain[i] += dgamma * n[i];
        }
        plastic.alpha += (2.0f64 / 3.0).sqrt() * dgamma;
        self.trial = plastic;
        self.stress_zz = p + s[2];

        let theta = 1.0 - 2.0 * mu * dgamma / s_norm;
        let theta_bar = 1.0 / (1.0 + h / (3.0 * mu)) - (1.0 - theta);
        let c = 2.0 * mu * theta_bar;
        let c11 = k + 4.0 * mu * theta / 3.0 - c * n[0] * n[0];
        let c22 = k + 4.0 * mu * theta / 3.0 - c * n[1] * n[1];
        let c12 = k - 2.0 * mu * theta / 3.0 - c * n[0] * n[1];
        let c13 = -c * n[0] * n[3];
        let c23 = -c * n[1] * n[3];
        let c33 = mu * theta - c * n[3] * n[3];
        #[rustfmt::skip]
        let tangent = Mat::from_row_slice(3, 3, &[
            c11, c12, c13,
            c12, c22, c23,
            c13, c23, c33,
        ]);

        let stress = Vector::from_vec(vec![p + s[0], p + s[1], s[3]]);
        self.response.store(strain, stress, tangent);
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
        let mut h = self.committed.strain.to_vec();
        h.push(self.committed.alpha);
        h
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}
