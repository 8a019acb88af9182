//! Layered beam cross-section built from uniaxial materials
//!
//! Section strain is `[ε0, κ]` (reference-axis strain and curvature), the
//! stress resultant is `[N, M]`. A layer at height `y` sees
//! `ε = ε0 - y·κ`, so positive curvature compresses the top.

use serde::{Deserialize, Serialize};

use super::{expect_strain_size, Elastic, Material, MaterialKind, Response, StateTag};
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vector};

/// Parameters for an elastic section with given axial and bending stiffness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionParams {
    /// Modulus of elasticity
    #[serde(rename = "E")]
    pub e: f64,
    /// Cross-sectional area
    #[serde(rename = "A")]
    pub area: f64,
    /// Second moment of area about the bending axis
    #[serde(rename = "I")]
    pub inertia: f64,
}

impl Default for SectionParams {
    fn default() -> Self {
        Self {
            e: 1.0,
            area: 1.0,
            inertia: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Layer {
    y: f64,
    area: f64,
    material: Box<dyn Material>,
}

#[derive(Debug, Clone)]
pub struct SectionMaterial {
    layers: Vec<Layer>,
    response: Response,
}

impl SectionMaterial {
    /// Empty section; add layers with [`SectionMaterial::add_layer`]
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            response: Response::new(2),
        }
    }

    /// Add a layer at height `y` with tributary `area`
    pub fn add_layer(&mut self, y: f64, area: f64, material: Box<dyn Material>) -> FEAResult<()> {
        expect_strain_size(material.as_ref(), 1, "section layer")?;
        if area <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "layer area must be positive, got {}",
                area
            )));
        }
        self.layers.push(Layer { y, area, material });
        Ok(())
    }

    /// Elastic section reproducing `E·A` and `E·I` exactly with two layers
    pub fn elastic(params: SectionParams) -> FEAResult<Self> {
        if params.area <= 0.0 || params.inertia <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "section needs A > 0 and I > 0 (got A={}, I={})",
                params.area, params.inertia
            )));
        }
        let y = (params.inertia / params.area).sqrt();
        let mut section = Self::new();
        for sign in [1.0, -1.0] {
            let layer = Box::new(Elastic::with_modulus(params.e));
            section.add_layer(sign * y, params.area / 2.0, layer)?;
        }
        Ok(section)
    }

    /// Rectangular section of `n_layers` equal strips, each a copy of `prototype`
    pub fn rectangular(
        width: f64,
        depth: f64,
        n_layers: usize,
        prototype: &dyn Material,
    ) -> FEAResult<Self> {
        if width <= 0.0 || depth <= 0.0 || n_layers == 0 {
            return Err(FEAError::InvalidInput(format!(
                "rectangular section needs positive size and layers (got {} x {}, {} layers)",
                width, depth, n_layers
            )));
        }
        let h = depth / n_layers as f64;
        let mut section = Self::new();
        for i in 0..n_layers {
            let y = -0.5 * depth + (i as f64 + 0.5) * h;
            section.add_layer(y, width * h, prototype.clone_box())?;
        }
        Ok(section)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Stresses of all layers, bottom to top in insertion order
    pub fn layer_stresses(&self) -> FEAResult<Vec<f64>> {
        self.layers
            .iter()
            .map(|layer| Ok(layer.material.stress()?[0]))
            .collect()
    }
}

impl Default for SectionMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl Material for SectionMaterial {
    fn kind(&self) -> MaterialKind {
        MaterialKind::Section
    }

    fn strain_size(&self) -> usize {
        2
    }

    fn set_strain(&mut self, strain: &[f64]) -> FEAResult<()> {
        self.response.check_len(strain, self.kind())?;
        if self.layers.is_empty() {
            return Err(FEAError::InvalidInput("section has no layers".to_string()));
        }
        let (eps0, kappa) = (strain[0], strain[1]);

        let mut stress = Vector::zeros(2);
        let mut tangent = Mat::zeros(2, 2);
        for layer in &mut self.layers {
            let y = layer.y;
            layer.material.set_strain(&[eps0 - y * kappa])?;
            let sigma = layer.material.stress()?[0];
            let ea = layer.material.stiffness()?[(0, 0)] * layer.area;

            stress[0] += sigma * layer.area;
            stress[1] -= sigma * layer.area * y;
            tangent[(0, 0)] += ea;
            tangent[(0, 1)] -= ea * y;
            tangent[(1, 1)] += ea * y * y;
        }
        tangent[(1, 0)] = tangent[(0, 1)];

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
        for layer in &mut self.layers {
            layer.material.commit();
        }
    }

    fn history(&self) -> Vec<f64> {
        self.layers
            .iter()
            .flat_map(|layer| layer.material.history())
            .collect()
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}
