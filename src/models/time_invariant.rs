//! Time-invariant model assembled from raw matrices
//!
//! For models built elsewhere (ARIMA-in-state-space mappings, structural
//! decompositions with regressors folded in), the system matrices arrive
//! ready-made; this wrapper only checks that they fit together.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use super::StateSpaceModel;
use crate::{Result, SsfError};

/// A time-invariant state-space model defined by its raw system matrices.
///
/// Starts with a fully known zero initial state (`a0 = 0`, `Pf0 = 0`, no
/// diffuse directions); use the builder methods to install initialization
/// data.
#[derive(Debug, Clone)]
pub struct TimeInvariant<T: RealField> {
    transition: DMatrix<T>,
    noise: DMatrix<T>,
    loading: DVector<T>,
    measurement_variance: T,
    a0: DVector<T>,
    p0: DMatrix<T>,
    constraints: DMatrix<T>,
}

impl<T: RealField + Float + Copy> TimeInvariant<T> {
    /// Creates a model from transition `T`, process noise `R*Q*R^T`, loading
    /// `Z` and measurement variance `H`.
    pub fn new(
        transition: DMatrix<T>,
        noise: DMatrix<T>,
        loading: DVector<T>,
        measurement_variance: T,
    ) -> Result<Self> {
        let m = transition.nrows();
        if transition.ncols() != m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: transition.ncols(),
            });
        }
        if noise.nrows() != m || noise.ncols() != m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: noise.nrows(),
            });
        }
        if loading.len() != m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: loading.len(),
            });
        }
        Ok(Self {
            transition,
            noise,
            loading,
            measurement_variance,
            a0: DVector::zeros(m),
            p0: DMatrix::zeros(m, m),
            constraints: DMatrix::zeros(m, 0),
        })
    }

    /// Installs the initial state mean `a0`.
    pub fn with_initial_state(mut self, a0: DVector<T>) -> Result<Self> {
        if a0.len() != self.transition.nrows() {
            return Err(SsfError::DimensionMismatch {
                expected: self.transition.nrows(),
                actual: a0.len(),
            });
        }
        self.a0 = a0;
        Ok(self)
    }

    /// Installs the finite initial covariance `Pf0`.
    pub fn with_initial_covariance(mut self, p0: DMatrix<T>) -> Result<Self> {
        let m = self.transition.nrows();
        if p0.nrows() != m || p0.ncols() != m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: p0.nrows(),
            });
        }
        self.p0 = p0;
        Ok(self)
    }

    /// Installs the diffuse constraint matrix `B0` (m x d0).
    pub fn with_diffuse_constraints(mut self, b: DMatrix<T>) -> Result<Self> {
        let m = self.transition.nrows();
        if b.nrows() != m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: b.nrows(),
            });
        }
        if b.ncols() > m {
            return Err(SsfError::DimensionMismatch {
                expected: m,
                actual: b.ncols(),
            });
        }
        self.constraints = b;
        Ok(self)
    }
}

impl<T: RealField + Float + Copy> StateSpaceModel<T> for TimeInvariant<T> {
    fn state_dim(&self) -> usize {
        self.transition.nrows()
    }

    fn diffuse_dim(&self) -> usize {
        self.constraints.ncols()
    }

    fn transition_matrix(&self, _pos: usize) -> DMatrix<T> {
        self.transition.clone()
    }

    fn process_noise(&self, _pos: usize) -> DMatrix<T> {
        self.noise.clone()
    }

    fn loading(&self, _pos: usize) -> DVector<T> {
        self.loading.clone()
    }

    fn measurement_variance(&self, _pos: usize) -> T {
        self.measurement_variance
    }

    fn initial_state(&self) -> DVector<T> {
        self.a0.clone()
    }

    fn initial_covariance(&self) -> DMatrix<T> {
        self.p0.clone()
    }

    fn diffuse_constraints(&self) -> DMatrix<T> {
        self.constraints.clone()
    }
}
