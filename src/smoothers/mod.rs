//! Backward pass: ordinary suffix smoothing, then diffuse prefix smoothing

mod diffuse;
mod ordinary;

pub use diffuse::DiffuseSmoother;
pub use ordinary::OrdinarySmoother;

use alloc::vec::Vec;

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use crate::filters::{FilteringResults, StorageMode};
use crate::models::StateSpaceModel;
use crate::{Result, SsfError};

/// Configuration of a smoothing run.
#[derive(Debug, Clone, Copy)]
pub struct SmootherOptions {
    /// Compute smoothed covariances alongside the means.
    pub variances: bool,
    /// Rescale smoothed covariances once, after the recursion, by the
    /// concentrated innovation-variance scale estimated during filtering.
    pub rescale_variances: bool,
}

impl Default for SmootherOptions {
    fn default() -> Self {
        Self {
            variances: true,
            rescale_variances: false,
        }
    }
}

/// Smoothed state sequence conditional on the whole series.
#[derive(Debug, Clone)]
pub struct SmoothingResults<T: RealField> {
    /// Smoothed means, one per position
    pub states: Vec<DVector<T>>,
    /// Smoothed covariances, when requested
    pub covariances: Option<Vec<DMatrix<T>>>,
}

impl<T: RealField + Copy> SmoothingResults<T> {
    fn sized(n: usize, dim: usize, variances: bool) -> Self {
        Self {
            states: alloc::vec![DVector::zeros(dim); n],
            covariances: if variances {
                Some(alloc::vec![DMatrix::zeros(dim, dim); n])
            } else {
                None
            },
        }
    }

    /// Number of positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true for an empty series.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Runs the backward pass over a completed forward pass.
///
/// The ordinary smoother covers `t in [end_diffuse, n)` and hands its
/// boundary accumulators to the diffuse smoother, which covers the prefix.
/// Requires results stored in [`StorageMode::Full`].
pub fn smooth<T, M>(
    model: &M,
    results: &FilteringResults<T>,
    options: &SmootherOptions,
) -> Result<SmoothingResults<T>>
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    if results.mode() != StorageMode::Full {
        return Err(SsfError::SmoothingUnavailable);
    }
    let n = results.len();
    let dim = model.state_dim();
    let mut out = SmoothingResults::sized(n, dim, options.variances);

    let mut suffix = OrdinarySmoother::new(dim);
    suffix.run(model, results, &mut out)?;

    if results.end_diffuse() > 0 {
        let (r, n_mat) = suffix.into_boundary();
        let mut prefix = DiffuseSmoother::from_boundary(r, n_mat);
        prefix.run(model, results, &mut out)?;
    }

    if options.rescale_variances {
        if let (Some(covariances), Some(scale)) =
            (out.covariances.as_mut(), results.likelihood().scale())
        {
            for v in covariances.iter_mut() {
                *v *= scale;
            }
        }
    }
    Ok(out)
}
