use faer::prelude::*;

use crate::geometry::Vector3;

/// Reads column `j` of a `[3][n]` matrix as a vector.
#[inline]
pub fn col3(m: &Mat<f64>, j: usize) -> Vector3 {
    Vector3::new(m[(0, j)], m[(1, j)], m[(2, j)])
}

/// Overwrites column `j` of a `[3][n]` matrix.
#[inline]
pub fn set_col3(m: &mut Mat<f64>, j: usize, v: Vector3) {
    m[(0, j)] = v.x;
    m[(1, j)] = v.y;
    m[(2, j)] = v.z;
}

/// Accumulates into column `j` of a `[3][n]` matrix.
#[inline]
pub fn add_col3(m: &mut Mat<f64>, j: usize, v: Vector3) {
    m[(0, j)] += v.x;
    m[(1, j)] += v.y;
    m[(2, j)] += v.z;
}

/// Builds a `[3][n]` matrix from a slice of vectors.
pub fn mat_from_vectors(v: &[Vector3]) -> Mat<f64> {
    Mat::from_fn(3, v.len(), |i, j| match i {
        0 => v[j].x,
        1 => v[j].y,
        _ => v[j].z,
    })
}

/// Columns of a `[3][n]` matrix as vectors.
pub fn vectors_from_mat(m: &Mat<f64>) -> Vec<Vector3> {
    (0..m.ncols()).map(|j| col3(m, j)).collect()
}

/// Largest absolute entry of a matrix, zero when empty.
pub fn max_abs(m: &Mat<f64>) -> f64 {
    m.col_iter()
        .map(|c| c.iter().fold(0., |max: f64, v| max.max(v.abs())))
        .fold(0., f64::max)
}
