//! Diffuse smoothing over the prefix
//!
//! Expanding the standard smoother in powers of 1/kappa around the infinite
//! diffuse variance splits each accumulator in two (mean) or three
//! (variance) parts. With `K_inf = T*Ci/fi`, `K_star = T*(C*fi - Ci*f)/fi^2`,
//! `L_inf = T - K_inf*Z` and `L_star = -K_star*Z`, a step that consumed a
//! diffuse direction updates
//!
//! ```text
//! r1 <- Z^T*e/fi + L_inf^T*r1 + L_star^T*r0
//! r0 <- L_inf^T*r0
//! N0 <- L_inf^T*N0*L_inf
//! N1 <- Z^T*Z/fi + L_inf^T*N1*L_inf + L_inf^T*N0*L_star + L_star^T*N0*L_inf
//! N2 <- -Z^T*Z*f/fi^2 + L_inf^T*N2*L_inf + L_inf^T*N1*L_star
//!       + L_star^T*N1*L_inf + L_star^T*N0*L_star
//! ```
//!
//! while an `fi = 0` step runs the ordinary update on `(r0, N0)` and carries
//! the diffuse accumulators through the same `L`. The smoothed moments then
//! combine the finite and diffuse contributions through the stored
//! constraint matrix, `Pi = B*B^T`:
//!
//! ```text
//! a_hat = a + P*r0 + Pi*r1
//! V     = P - P*N0*P - Pi*N1*P - P*N1*Pi - Pi*N2*Pi
//! ```
//!
//! On steps whose observation was missing the measurement terms drop out of
//! the recursions but the gain transforms still apply, mirroring what the
//! forward pass did to the covariance on those steps.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use super::ordinary::{check_finite_diagonal, symmetrize};
use super::SmoothingResults;
use crate::filters::FilteringResults;
use crate::models::StateSpaceModel;
use crate::{Result, SsfError};

/// Backward smoother for the diffuse prefix.
///
/// Seeded from the ordinary smoother's boundary accumulators; maintains the
/// ordinary accumulators `(r0, N0)` plus the diffuse mean accumulator `r1`
/// and the diffuse-cross/diffuse-diffuse matrices `(N1, N2)`.
#[derive(Debug, Clone)]
pub struct DiffuseSmoother<T: RealField> {
    r0: DVector<T>,
    r1: DVector<T>,
    n0: DMatrix<T>,
    n1: DMatrix<T>,
    n2: DMatrix<T>,
}

impl<T: RealField + Float + Copy> DiffuseSmoother<T> {
    /// Seeds the smoother with the ordinary boundary values at the collapse
    /// position; the diffuse accumulators start at zero.
    pub fn from_boundary(r: DVector<T>, n: DMatrix<T>) -> Self {
        let dim = r.len();
        Self {
            r0: r,
            r1: DVector::zeros(dim),
            n0: n,
            n1: DMatrix::zeros(dim, dim),
            n2: DMatrix::zeros(dim, dim),
        }
    }

    /// Smooths `t in [0, end_diffuse)` back to front, writing into `out`.
    pub fn run<M>(
        &mut self,
        model: &M,
        results: &FilteringResults<T>,
        out: &mut SmoothingResults<T>,
    ) -> Result<()>
    where
        M: StateSpaceModel<T> + ?Sized,
    {
        for t in (0..results.end_diffuse()).rev() {
            let record = results.record(t).ok_or(SsfError::SmoothingUnavailable)?;
            let info = &record.info;
            let b = record.b.as_ref().ok_or(SsfError::SmoothingUnavailable)?;
            let tmat = model.transition_matrix(t);
            let z = model.loading(t);

            match &info.ci {
                Some(ci) => {
                    let fi_inv = T::one() / info.fi;
                    let k_inf = (&tmat * ci) * fi_inv;
                    let k_star = &tmat * (&info.c * fi_inv - ci * (info.f * fi_inv * fi_inv));
                    let l_inf = &tmat - &k_inf * z.transpose();
                    let l_star = -(&k_star * z.transpose());

                    let mut r1 = l_inf.tr_mul(&self.r1) + l_star.tr_mul(&self.r0);
                    if !info.is_missing() {
                        r1 += &z * (info.e * fi_inv);
                    }
                    let r0 = l_inf.tr_mul(&self.r0);

                    let zz = &z * z.transpose();
                    let n0_l_star = &self.n0 * &l_star;
                    let n1_l_star = &self.n1 * &l_star;
                    let n0 = l_inf.transpose() * &self.n0 * &l_inf;
                    let n1 = &zz * fi_inv
                        + l_inf.transpose() * &self.n1 * &l_inf
                        + l_inf.transpose() * &n0_l_star
                        + n0_l_star.transpose() * &l_inf;
                    let n2 = -(&zz * (info.f * fi_inv * fi_inv))
                        + l_inf.transpose() * &self.n2 * &l_inf
                        + l_inf.transpose() * &n1_l_star
                        + n1_l_star.transpose() * &l_inf
                        + l_star.transpose() * &n0_l_star;

                    self.r0 = r0;
                    self.r1 = r1;
                    self.n0 = n0;
                    self.n1 = n1;
                    self.n2 = n2;
                }
                None => {
                    let l = if !info.is_missing() && info.f > T::zero() {
                        let k = (&tmat * &info.c) * (T::one() / info.f);
                        &tmat - &k * z.transpose()
                    } else {
                        tmat.clone()
                    };
                    if !info.is_missing() && info.f > T::zero() {
                        let f_inv = T::one() / info.f;
                        self.r0 = &z * (info.e * f_inv) + l.tr_mul(&self.r0);
                        self.n0 = &z * z.transpose() * f_inv + l.transpose() * &self.n0 * &l;
                    } else {
                        self.r0 = l.tr_mul(&self.r0);
                        self.n0 = l.transpose() * &self.n0 * &l;
                    }
                    self.r1 = l.tr_mul(&self.r1);
                    self.n1 = l.transpose() * &self.n1 * &l;
                    self.n2 = l.transpose() * &self.n2 * &l;
                }
            }

            out.states[t] = &record.a + &record.p * &self.r0 + b * b.tr_mul(&self.r1);
            if let Some(covariances) = out.covariances.as_mut() {
                let pi = b * b.transpose();
                let n1_p = &self.n1 * &record.p;
                let mut v = &record.p
                    - &record.p * &self.n0 * &record.p
                    - &pi * &n1_p
                    - n1_p.transpose() * &pi
                    - &pi * &self.n2 * &pi;
                symmetrize(&mut v);
                check_finite_diagonal(&v, t)?;
                covariances[t] = v;
            }
        }
        Ok(())
    }
}
