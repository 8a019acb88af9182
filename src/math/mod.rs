//! Mathematical utilities for FE calculations

pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix2};

pub use sparse::{solve_pcg, SparseMatrixBuilder};

pub type Mat = DMatrix<f64>;
pub type Vector = DVector<f64>;
pub type Mat2 = Matrix2<f64>;

/// Lengths and areas below this are treated as zero
pub const GEOMETRY_TOLERANCE: f64 = 1e-10;

/// Gauss-Legendre points and weights mapped onto the unit interval [0, 1]
///
/// Supports 1 to 4 points. Weights sum to one.
pub fn gauss_points(n: usize) -> Option<Vec<(f64, f64)>> {
    let rule: &[(f64, f64)] = match n {
        1 => &[(0.0, 2.0)],
        2 => &[(-0.577_350_269_189_625_8, 1.0), (0.577_350_269_189_625_8, 1.0)],
        3 => &[
            (-0.774_596_669_241_483_4, 5.0 / 9.0),
            (0.0, 8.0 / 9.0),
            (0.774_596_669_241_483_4, 5.0 / 9.0),
        ],
        4 => &[
            (-0.861_136_311_594_052_6, 0.347_854_845_137_453_9),
            (-0.339_981_043_584_856_3, 0.652_145_154_862_546_1),
            (0.339_981_043_584_856_3, 0.652_145_154_862_546_1),
            (0.861_136_311_594_052_6, 0.347_854_845_137_453_9),
        ],
        _ => return None,
    };

    Some(
        rule.iter()
            .map(|&(xi, w)| (0.5 * (xi + 1.0), 0.5 * w))
            .collect(),
    )
}

/// Compute the transformation matrix for a 2D frame element
///
/// # Arguments
/// * `i_node` - Start node coordinates [X, Y]
/// * `j_node` - End node coordinates [X, Y]
///
/// # Returns
/// 6x6 matrix mapping global [ux, uy, rz] pairs onto local [u, w, θ] pairs,
/// together with the element length
pub fn frame_transformation_2d(i_node: &[f64; 2], j_node: &[f64; 2]) -> Option<(Mat, f64)> {
    let dx = j_node[0] - i_node[0];
    let dy = j_node[1] - i_node[1];
    let length = (dx * dx + dy * dy).sqrt();

    if length < GEOMETRY_TOLERANCE {
        return None;
    }

    let c = dx / length;
    let s = dy / length;

    let mut t = Mat::zeros(6, 6);
    for node in 0..2 {
        let o = node * 3;
        t[(o, o)] = c;
        t[(o, o + 1)] = s;
        t[(o + 1, o)] = -s;
        t[(o + 1, o + 1)] = c;
        t[(o + 2, o + 2)] = 1.0;
    }

    Some((t, length))
}

/// Check a square matrix for symmetry within a relative tolerance
pub fn is_symmetric(m: &Mat, rel_tol: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    let scale = m.amax().max(f64::MIN_POSITIVE);
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            if (m[(i, j)] - m[(j, i)]).abs() > rel_tol * scale {
                return false;
            }
        }
    }
    true
}

/// Solve a linear system using LU decomposition
pub fn solve_linear_system(a: &Mat, b: &Vector) -> Option<Vector> {
    a.clone().lu().solve(b)
}

/// Solve a linear system using Cholesky decomposition (for symmetric positive definite)
pub fn solve_cholesky(a: &Mat, b: &Vector) -> Option<Vector> {
    a.clone().cholesky().map(|chol| chol.solve(b))
}
