//! Stability diagnostics on the assembled tangent stiffness

use log::debug;
use nalgebra::SymmetricEigen;
use serde::{Deserialize, Serialize};

use crate::domain::{Assembly, DofHandle, System};
use crate::error::{FEAError, FEAResult};
use crate::math::Mat;

/// Definiteness of the tangent stiffness at the current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub determinant: f64,
    /// Smallest eigenvalue of the symmetric part
    pub min_eigenvalue: f64,
    /// Number of non-positive eigenvalues
    pub negative_count: usize,
    /// True when the tangent is positive definite
    pub stable: bool,
}

fn symmetric_part(k: &Mat) -> Mat {
    (k + k.transpose()) * 0.5
}

fn eigen(k: &Mat) -> FEAResult<SymmetricEigen<f64, nalgebra::Dyn>> {
    if k.is_empty() {
        return Err(FEAError::AnalysisFailed(
            "No free degrees of freedom".to_string(),
        ));
    }
    Ok(SymmetricEigen::new(symmetric_part(k)))
}

/// Use the current assembly, assembling first if the model changed
fn current_assembly(system: &mut System) -> FEAResult<&Assembly> {
    if system.assembly().is_none() {
        system.assemble()?;
    }
    system
        .assembly()
        .ok_or_else(|| FEAError::UninitializedState("assembly".to_string()))
}

/// Eigenvalue test of an existing assembly
pub fn stability_of(assembly: &Assembly) -> FEAResult<StabilityReport> {
    let k = assembly.stiffness();
    let decomposition = eigen(&k)?;
    let eigenvalues = &decomposition.eigenvalues;
    let scale = eigenvalues.amax().max(f64::MIN_POSITIVE);
    let min_eigenvalue = eigenvalues.min();
    let negative_count = eigenvalues.iter().filter(|&&v| v <= 1e-12 * scale).count();

    Ok(StabilityReport {
        determinant: k.determinant(),
        min_eigenvalue,
        negative_count,
        stable: negative_count == 0,
    })
}

/// Check whether the tangent at the current state is positive definite
pub fn check_stability(system: &mut System) -> FEAResult<StabilityReport> {
    let report = stability_of(current_assembly(system)?)?;
    debug!(
        "stability at λ = {}: min eigenvalue {:.4e}, {} non-positive",
        system.load_factor(),
        report.min_eigenvalue,
        report.negative_count
    );
    Ok(report)
}

/// Eigenvector of the smallest-magnitude eigenvalue, scaled so its largest
/// component has magnitude one
pub fn buckling_mode(system: &mut System) -> FEAResult<Vec<(DofHandle, f64)>> {
    let assembly = current_assembly(system)?;
    let k = assembly.stiffness();
    let decomposition = eigen(&k)?;
    let (column, _) = decomposition
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .ok_or_else(|| FEAError::AnalysisFailed("empty eigenvalue set".to_string()))?;

    let mode = decomposition.eigenvectors.column(column);
    let peak = mode.iter().copied().fold(0.0, |m: f64, v| if v.abs() > m.abs() { v } else { m });
    if peak == 0.0 {
        return Err(FEAError::AnalysisFailed("zero buckling mode".to_string()));
    }
    Ok(assembly
        .dofs()
        .iter()
        .zip(mode.iter())
        .map(|(&handle, &v)| (handle, v / peak))
        .collect())
}
