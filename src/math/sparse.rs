//! Sparse matrix utilities for the iterative linear-solve strategy
//!
//! Tangent matrices of larger meshes are mostly zeros. The builder collects
//! triplets during scatter and converts them to CSR for a preconditioned
//! conjugate gradient solve.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Sparse matrix builder using COO format
#[derive(Debug, Clone)]
pub struct SparseMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    /// Create a new sparse matrix builder
    pub fn new(size: usize) -> Self {
        // Rough guess: a node couples with a handful of neighbours
        let estimated_nnz = size * 18;
        Self {
            size,
            entries: Vec::with_capacity(estimated_nnz),
        }
    }

    /// Build from the non-zero entries of a dense matrix
    pub fn from_dense(mat: &DMatrix<f64>) -> Self {
        let mut builder = Self::new(mat.nrows());
        for j in 0..mat.ncols() {
            for i in 0..mat.nrows() {
                builder.add(i, j, mat[(i, j)]);
            }
        }
        builder
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter an element matrix using its global index list.
    /// Entries whose index is `None` (fixed DOFs) are skipped.
    pub fn add_element_matrix(&mut self, dofs: &[Option<usize>], k_elem: &DMatrix<f64>) {
        for (a, da) in dofs.iter().enumerate() {
            let Some(i) = *da else { continue };
            for (b, db) in dofs.iter().enumerate() {
                if let Some(j) = *db {
                    self.add(i, j, k_elem[(a, b)]);
                }
            }
        }
    }

    /// Convert to CSR format for efficient solves
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CsrMatrix::from(&coo)
    }

    /// Convert to dense matrix
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }

    /// Number of stored triplets (duplicates included)
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Solve sparse linear system using Preconditioned Conjugate Gradient
///
/// Uses Jacobi (diagonal) preconditioner. Returns `None` on breakdown
/// (indefinite or singular matrix) or when `max_iter` is exhausted.
pub fn solve_pcg(
    csr: &CsrMatrix<f64>,
    b: &DVector<f64>,
    tol: f64,
    max_iter: usize,
) -> Option<DVector<f64>> {
    let n = csr.nrows();
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Some(DVector::zeros(n));
    }

    let mut diag = DVector::from_element(n, 1.0);
    for (row, col, &val) in csr.triplet_iter() {
        if row == col && val != 0.0 {
            diag[row] = val;
        }
    }

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let mut z = r.component_div(&diag);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);

    for _iter in 0..max_iter {
        let ap = sparse_matvec(csr, &p);
        let p_dot_ap = p.dot(&ap);

        if p_dot_ap <= 0.0 {
            return None;
        }

        let alpha = r_dot_z / p_dot_ap;

        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if r.norm() <= tol * b_norm {
            return Some(x);
        }

        z = r.component_div(&diag);
        let r_dot_z_new = r.dot(&z);
        let beta = r_dot_z_new / r_dot_z;
        r_dot_z = r_dot_z_new;

        p = &z + beta * &p;
    }

    None
}

/// Sparse matrix-vector multiplication
#[inline]
fn sparse_matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let n = csr.nrows();
    let mut y = DVector::zeros(n);

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    for row in 0..n {
        let mut sum = 0.0;
        for idx in row_offsets[row]..row_offsets[row + 1] {
            sum += values[idx] * x[col_indices[idx]];
        }
        y[row] = sum;
    }

    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_skips_fixed() {
        let mut builder = SparseMatrixBuilder::new(2);
        let k = DMatrix::from_row_slice(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
        builder.add_element_matrix(&[None, Some(0), Some(1)], &k);

        let dense = builder.to_dense();
        assert!((dense[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((dense[(0, 1)] + 1.0).abs() < 1e-12);
        assert!((dense[(1, 1)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pcg_solve() {
        let mut builder = SparseMatrixBuilder::new(3);
        builder.add(0, 0, 4.0);
        builder.add(0, 1, -1.0);
        builder.add(1, 0, -1.0);
        builder.add(1, 1, 4.0);
        builder.add(1, 2, -1.0);
        builder.add(2, 1, -1.0);
        builder.add(2, 2, 4.0);

        let csr = builder.to_csr();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let x = solve_pcg(&csr, &b, 1e-12, 100).unwrap();

        let ax = sparse_matvec(&csr, &x);
        let error = (&ax - &b).norm();
        assert!(error < 1e-8, "Error: {}", error);
    }

    #[test]
    fn test_pcg_rejects_indefinite() {
        let mut builder = SparseMatrixBuilder::new(2);
        builder.add(0, 0, 1.0);
        builder.add(1, 1, -1.0);
        let csr = builder.to_csr();
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!(solve_pcg(&csr, &b, 1e-12, 50).is_none());
    }
}
