//! Ordinary fixed-interval smoothing over the non-diffuse suffix
//!
//! Information-form backward recursion: starting from zero accumulators at
//! the series end,
//!
//! ```text
//! L = T - (T*C/f)*Z          (T alone when missing or f = 0)
//! r <- Z^T*e/f + L^T*r
//! N <- Z^T*Z/f + L^T*N*L
//! a_hat = a + P*r,    V = P - P*N*P
//! ```
//!
//! per step, walking back to the collapse position. The accumulators left
//! after the last step are exactly the boundary values the diffuse smoother
//! needs.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use super::SmoothingResults;
use crate::filters::FilteringResults;
use crate::models::StateSpaceModel;
use crate::{Result, SsfError};

/// Backward smoother for the ordinary (post-collapse) segment.
#[derive(Debug, Clone)]
pub struct OrdinarySmoother<T: RealField> {
    r: DVector<T>,
    n_mat: DMatrix<T>,
}

impl<T: RealField + Float + Copy> OrdinarySmoother<T> {
    /// Creates a smoother with zero accumulators for a state of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            r: DVector::zeros(dim),
            n_mat: DMatrix::zeros(dim, dim),
        }
    }

    /// Current accumulators `(r, N)`.
    pub fn boundary(&self) -> (&DVector<T>, &DMatrix<T>) {
        (&self.r, &self.n_mat)
    }

    /// Consumes the smoother, yielding the boundary accumulators.
    pub fn into_boundary(self) -> (DVector<T>, DMatrix<T>) {
        (self.r, self.n_mat)
    }

    /// Smooths `t in [end_diffuse, n)` back to front, writing into `out`.
    pub fn run<M>(
        &mut self,
        model: &M,
        results: &FilteringResults<T>,
        out: &mut SmoothingResults<T>,
    ) -> Result<()>
    where
        M: StateSpaceModel<T> + ?Sized,
    {
        for t in (results.end_diffuse()..results.len()).rev() {
            let record = results.record(t).ok_or(SsfError::SmoothingUnavailable)?;
            let info = &record.info;
            let tmat = model.transition_matrix(t);
            let z = model.loading(t);

            if !info.is_missing() && info.f > T::zero() {
                let f_inv = T::one() / info.f;
                let k = (&tmat * &info.c) * f_inv;
                let l = &tmat - &k * z.transpose();
                self.r = &z * (info.e * f_inv) + l.tr_mul(&self.r);
                self.n_mat = &z * z.transpose() * f_inv + l.transpose() * &self.n_mat * &l;
            } else {
                self.r = tmat.tr_mul(&self.r);
                self.n_mat = tmat.transpose() * &self.n_mat * &tmat;
            }

            out.states[t] = &record.a + &record.p * &self.r;
            if let Some(covariances) = out.covariances.as_mut() {
                let mut v = &record.p - &record.p * &self.n_mat * &record.p;
                symmetrize(&mut v);
                check_finite_diagonal(&v, t)?;
                covariances[t] = v;
            }
        }
        Ok(())
    }
}

pub(super) fn symmetrize<T: RealField + Copy>(v: &mut DMatrix<T>) {
    let half = T::from_f64(0.5).unwrap();
    let vt = v.transpose();
    *v += vt;
    *v *= half;
}

pub(super) fn check_finite_diagonal<T: RealField + Float + Copy>(
    v: &DMatrix<T>,
    pos: usize,
) -> crate::Result<()> {
    for i in 0..v.nrows() {
        if Float::is_nan(v[(i, i)]) {
            return Err(SsfError::ModelDegeneracy { pos });
        }
    }
    Ok(())
}
