//! Shared fixtures for the filtering/smoothing integration tests

#![allow(dead_code)]

use nalgebra::{DMatrix, DVector};
use ssfilter::models::{StateSpaceModel, TimeInvariant};

/// A one-dimensional level model with a *proper* (non-diffuse) prior.
pub fn proper_level(phi: f64, q: f64, h: f64, a0: f64, p0: f64) -> TimeInvariant<f64> {
    TimeInvariant::new(
        DMatrix::from_element(1, 1, phi),
        DMatrix::from_element(1, 1, q),
        DVector::from_element(1, 1.0),
        h,
    )
    .unwrap()
    .with_initial_state(DVector::from_element(1, a0))
    .unwrap()
    .with_initial_covariance(DMatrix::from_element(1, 1, p0))
    .unwrap()
}

/// Local-linear-trend system matrices with a configurable number of diffuse
/// directions (level first, then slope).
pub fn trend_with_diffuse_dim(d0: usize, q_level: f64, q_slope: f64, h: f64) -> TimeInvariant<f64> {
    let mut noise = DMatrix::zeros(2, 2);
    noise[(0, 0)] = q_level;
    noise[(1, 1)] = q_slope;
    let mut b = DMatrix::zeros(2, d0);
    for j in 0..d0 {
        b[(j, j)] = 1.0;
    }
    TimeInvariant::new(
        DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]),
        noise,
        DVector::from_vec(vec![1.0, 0.0]),
        h,
    )
    .unwrap()
    .with_diffuse_constraints(b)
    .unwrap()
}

/// Deterministic wiggly series: drift plus a slow oscillation.
pub fn wiggly_series(n: usize) -> Vec<f64> {
    (0..n)
        .map(|t| 0.3 * t as f64 + (t as f64 * 0.7).sin())
        .collect()
}

/// Exact straight line `a + b*t`.
pub fn line_series(n: usize, a: f64, b: f64) -> Vec<f64> {
    (0..n).map(|t| a + b * t as f64).collect()
}

/// Smallest number of stacked loading rows `[Z(0); Z(1)T(0); ...]` whose rank
/// reaches the model's initial diffuse dimension.
pub fn identification_length<M: StateSpaceModel<f64>>(model: &M, max: usize) -> Option<usize> {
    let m = model.state_dim();
    let d0 = model.diffuse_dim();
    let mut product = DMatrix::<f64>::identity(m, m);
    let mut stacked = DMatrix::<f64>::zeros(max, m);
    for k in 0..max {
        let row = product.tr_mul(&model.loading(k));
        for j in 0..m {
            stacked[(k, j)] = row[j];
        }
        if stacked.rows(0, k + 1).into_owned().rank(1e-9) == d0 {
            return Some(k + 1);
        }
        product = &model.transition_matrix(k) * &product;
    }
    None
}
