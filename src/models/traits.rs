//! The state-space model contract
//!
//! A model supplies, for every position of the series, the transition
//! operator, the process noise, the scalar measurement loading and its
//! variance, plus the initialization split into a finite covariance and a
//! diffuse constraint matrix.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use crate::{Result, SsfError};

/// A linear Gaussian state-space model with scalar measurements.
///
/// The model describes:
///
/// ```text
/// y(t)   = Z(t) * a(t) + eps,     eps ~ N(0, H(t))
/// a(t+1) = T(t) * a(t) + eta,     eta ~ N(0, R*Q*R^T)
/// a(0)   ~ N(a0, Pf0 + kappa * B0 * B0^T),   kappa -> infinity
/// ```
///
/// All operators must be well-defined (finite, dimensionally consistent) for
/// the full index range; violations are fatal setup errors reported by
/// [`validate`].
///
/// The definition is read-only during a run and may be shared across threads
/// evaluating independent series or parameter perturbations.
pub trait StateSpaceModel<T: RealField + Float + Copy> {
    /// State dimension `m`.
    fn state_dim(&self) -> usize;

    /// Initial diffuse dimension `d0` (column count of the constraint matrix).
    fn diffuse_dim(&self) -> usize;

    /// Transition matrix `T(pos)` (m x m).
    fn transition_matrix(&self, pos: usize) -> DMatrix<T>;

    /// Process noise contribution `R*Q*R^T` at `pos` (m x m).
    fn process_noise(&self, pos: usize) -> DMatrix<T>;

    /// Measurement loading `Z(pos)` as a length-m vector.
    fn loading(&self, pos: usize) -> DVector<T>;

    /// Measurement noise variance `H(pos)`.
    fn measurement_variance(&self, pos: usize) -> T;

    /// Initial state mean `a0`. Defaults to zero.
    fn initial_state(&self) -> DVector<T> {
        DVector::zeros(self.state_dim())
    }

    /// Finite part `Pf0` of the initial covariance (m x m).
    fn initial_covariance(&self) -> DMatrix<T>;

    /// Diffuse constraint matrix `B0` (m x d0).
    fn diffuse_constraints(&self) -> DMatrix<T>;

    /// `Z(pos) * x`.
    fn zx(&self, pos: usize, x: &DVector<T>) -> T {
        self.loading(pos).dot(x)
    }

    /// `Z(pos) * V * Z(pos)^T`.
    fn zvz(&self, pos: usize, v: &DMatrix<T>) -> T {
        let z = self.loading(pos);
        (v * &z).dot(&z)
    }

    /// Applies the transition in place: `x <- T(pos) * x`.
    fn apply_transition(&self, pos: usize, x: &mut DVector<T>) {
        let t = self.transition_matrix(pos);
        *x = &t * &*x;
    }

    /// Applies the transition to a covariance in place: `V <- T(pos) * V * T(pos)^T`.
    fn apply_transition_cov(&self, pos: usize, v: &mut DMatrix<T>) {
        let t = self.transition_matrix(pos);
        *v = &t * &*v * t.transpose();
    }
}

/// Checks a model for dimensional consistency and operator finiteness over
/// `pos in [0, n)`.
///
/// Dimensional violations surface as [`SsfError::DimensionMismatch`],
/// non-finite operator entries as [`SsfError::ModelDegeneracy`] at the
/// offending position. Run once before filtering; the recursions themselves
/// assume a validated model.
pub fn validate<T, M>(model: &M, n: usize) -> Result<()>
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    let m = model.state_dim();
    if m == 0 {
        return Err(SsfError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }
    check_len(model.initial_state().len(), m)?;
    check_square(&model.initial_covariance(), m)?;
    let b = model.diffuse_constraints();
    check_len(b.nrows(), m)?;
    check_len(b.ncols(), model.diffuse_dim())?;
    if model.diffuse_dim() > m {
        return Err(SsfError::DimensionMismatch {
            expected: m,
            actual: model.diffuse_dim(),
        });
    }
    if !all_finite(model.initial_state().iter())
        || !all_finite(model.initial_covariance().iter())
        || !all_finite(b.iter())
    {
        return Err(SsfError::ModelDegeneracy { pos: 0 });
    }
    for pos in 0..n {
        let t = model.transition_matrix(pos);
        check_square(&t, m)?;
        let q = model.process_noise(pos);
        check_square(&q, m)?;
        let z = model.loading(pos);
        check_len(z.len(), m)?;
        let h = model.measurement_variance(pos);
        if !all_finite(t.iter())
            || !all_finite(q.iter())
            || !all_finite(z.iter())
            || !Float::is_finite(h)
            || h < T::zero()
        {
            return Err(SsfError::ModelDegeneracy { pos });
        }
    }
    Ok(())
}

fn check_len(actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(SsfError::DimensionMismatch { expected, actual })
    }
}

fn check_square<T: RealField>(mat: &DMatrix<T>, side: usize) -> Result<()> {
    check_len(mat.nrows(), side)?;
    check_len(mat.ncols(), side)
}

fn all_finite<'a, T: RealField + Float + Copy + 'a, I: Iterator<Item = &'a T>>(mut it: I) -> bool {
    it.all(|v| Float::is_finite(*v))
}
