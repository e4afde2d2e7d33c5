//! Rank-reducing orthogonal row transforms
//!
//! The diffuse phase shrinks the constraint matrix `B` by one column per
//! consumed diffuse direction. The transform used for this is injectable: a
//! pure, stateless function that jointly rotates a row vector and the columns
//! of a matrix so that the row collapses onto its pivot entry. The default is
//! a sweep of Givens rotations.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

/// A pure orthogonal transform applied to a `(row, matrix)` pair.
///
/// Contract: after the call, `row` must be zero everywhere except its pivot
/// entry `row[0]`, `row`'s Euclidean norm must be preserved, and the same
/// orthogonal column operations must have been applied to `matrix` (so
/// `matrix * matrix^T` is unchanged).
pub type RowTransform<T> = fn(&mut DVector<T>, &mut DMatrix<T>);

/// Givens sweep collapsing `row` onto `row[0]` while co-rotating the columns
/// of `mat`.
///
/// Rotates entry `j` into the pivot for `j = 1..row.len()`, skipping entries
/// that are already zero. After the sweep `row[0]` holds `±||row||` (the sign
/// of the original pivot survives only when no rotation fires).
///
/// # Panics
/// Panics if `row.len() != mat.ncols()`.
pub fn row_givens<T: RealField + Float + Copy>(row: &mut DVector<T>, mat: &mut DMatrix<T>) {
    assert_eq!(
        row.len(),
        mat.ncols(),
        "Row length must match matrix column count"
    );
    let d = row.len();
    let m = mat.nrows();
    for j in 1..d {
        let rj = row[j];
        if rj == T::zero() {
            continue;
        }
        let r0 = row[0];
        let h = Float::hypot(r0, rj);
        let c = r0 / h;
        let s = rj / h;
        row[0] = h;
        row[j] = T::zero();
        for i in 0..m {
            let a0 = mat[(i, 0)];
            let aj = mat[(i, j)];
            mat[(i, 0)] = c * a0 + s * aj;
            mat[(i, j)] = c * aj - s * a0;
        }
    }
}
