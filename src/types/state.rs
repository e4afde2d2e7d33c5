//! State estimates for the filtering recursions
//!
//! `State` is the ordinary mean/covariance pair; `AugmentedState` additionally
//! carries the diffuse constraint matrix `B`, whose columns span the state
//! directions that still have infinite prior variance.

use alloc::vec::Vec;

use nalgebra::{DMatrix, DVector, RealField};

// ============================================================================
// Ordinary State
// ============================================================================

/// Gaussian state estimate: mean `a` and covariance `P`.
///
/// `P` is kept symmetric positive semi-definite by the recursions that own
/// the state; `symmetrize` repairs the small asymmetries that accumulate
/// under roundoff.
#[derive(Debug, Clone, PartialEq)]
pub struct State<T: RealField> {
    /// State estimate mean (length m)
    pub a: DVector<T>,
    /// State estimate covariance (m x m)
    pub p: DMatrix<T>,
}

impl<T: RealField + Copy> State<T> {
    /// Creates a state from a mean and covariance.
    ///
    /// # Panics
    /// Panics if `p` is not square with side `a.len()`.
    pub fn new(a: DVector<T>, p: DMatrix<T>) -> Self {
        assert_eq!(p.nrows(), a.len(), "Covariance rows must match state length");
        assert_eq!(p.ncols(), a.len(), "Covariance columns must match state length");
        Self { a, p }
    }

    /// Creates a zero-mean state with zero covariance.
    #[inline]
    pub fn zeros(dim: usize) -> Self {
        Self {
            a: DVector::zeros(dim),
            p: DMatrix::zeros(dim, dim),
        }
    }

    /// Returns the state dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.a.len()
    }

    /// Returns the trace of the covariance matrix (sum of variances).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.p.trace()
    }

    /// Averages `P` with its transpose.
    pub fn symmetrize(&mut self) {
        let half = T::from_f64(0.5).unwrap();
        let pt = self.p.transpose();
        self.p += pt;
        self.p *= half;
    }
}

// ============================================================================
// Augmented (diffuse) State
// ============================================================================

/// State estimate augmented with the diffuse constraint matrix `B` (m x d).
///
/// The diffuse part of the covariance is conceptually `Pi = B * B^T` scaled to
/// infinity; `d` is non-increasing over the diffuse phase and reaches 0 at the
/// collapse position.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedState<T: RealField> {
    /// Finite mean/covariance part
    pub state: State<T>,
    /// Diffuse constraint matrix (m x d)
    pub b: DMatrix<T>,
}

impl<T: RealField + Copy> AugmentedState<T> {
    /// Creates an augmented state.
    ///
    /// # Panics
    /// Panics if `b` does not have `state.dim()` rows.
    pub fn new(state: State<T>, b: DMatrix<T>) -> Self {
        assert_eq!(b.nrows(), state.dim(), "B rows must match state dimension");
        Self { state, b }
    }

    /// Returns the remaining diffuse dimension `d`.
    #[inline]
    pub fn diffuse_dim(&self) -> usize {
        self.b.ncols()
    }

    /// Returns true once every diffuse direction has been resolved.
    #[inline]
    pub fn is_collapsed(&self) -> bool {
        self.b.ncols() == 0
    }

    /// Removes `B` columns whose squared norm is at or below `tol`.
    ///
    /// Returns the number of columns dropped. Degenerate columns carry no
    /// diffuse direction and would otherwise stall the collapse forever.
    pub fn drop_negligible_columns(&mut self, tol: T) -> usize {
        let d = self.b.ncols();
        let mut kept = Vec::with_capacity(d);
        for j in 0..d {
            if self.b.column(j).norm_squared() > tol {
                kept.push(j);
            }
        }
        let dropped = d - kept.len();
        if dropped > 0 {
            let m = self.b.nrows();
            let mut reduced = DMatrix::zeros(m, kept.len());
            for (jj, &j) in kept.iter().enumerate() {
                reduced.set_column(jj, &self.b.column(j));
            }
            self.b = reduced;
        }
        dropped
    }
}
