//! Simple structural time-series models
//!
//! Reference implementations of the model contract, useful on their own and
//! as fixtures for the filtering/smoothing recursions.

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use super::StateSpaceModel;

// ============================================================================
// Local Level
// ============================================================================

/// Local-level model: a random-walk level observed with noise.
///
/// State: `[level]`, diffuse dimension 1.
///
/// ```text
/// y(t)       = level(t) + eps,    eps ~ N(0, h)
/// level(t+1) = level(t) + eta,    eta ~ N(0, q)
/// ```
#[derive(Debug, Clone)]
pub struct LocalLevel<T: RealField> {
    /// Level innovation variance `q`
    pub level_variance: T,
    /// Measurement noise variance `h`
    pub measurement_variance: T,
}

impl<T: RealField + Float + Copy> LocalLevel<T> {
    /// Creates a local-level model.
    ///
    /// # Panics
    /// Panics if either variance is negative.
    pub fn new(level_variance: T, measurement_variance: T) -> Self {
        assert!(
            level_variance >= T::zero(),
            "Level variance must be non-negative"
        );
        assert!(
            measurement_variance >= T::zero(),
            "Measurement variance must be non-negative"
        );
        Self {
            level_variance,
            measurement_variance,
        }
    }
}

impl<T: RealField + Float + Copy> StateSpaceModel<T> for LocalLevel<T> {
    fn state_dim(&self) -> usize {
        1
    }

    fn diffuse_dim(&self) -> usize {
        1
    }

    fn transition_matrix(&self, _pos: usize) -> DMatrix<T> {
        DMatrix::identity(1, 1)
    }

    fn process_noise(&self, _pos: usize) -> DMatrix<T> {
        DMatrix::from_element(1, 1, self.level_variance)
    }

    fn loading(&self, _pos: usize) -> DVector<T> {
        DVector::from_element(1, T::one())
    }

    fn measurement_variance(&self, _pos: usize) -> T {
        self.measurement_variance
    }

    fn initial_covariance(&self) -> DMatrix<T> {
        DMatrix::zeros(1, 1)
    }

    fn diffuse_constraints(&self) -> DMatrix<T> {
        DMatrix::identity(1, 1)
    }
}

// ============================================================================
// Local Linear Trend
// ============================================================================

/// Local-linear-trend model: random-walk level with a random-walk slope.
///
/// State: `[level, slope]`, diffuse dimension 2.
///
/// ```text
/// y(t)       = level(t) + eps
/// level(t+1) = level(t) + slope(t) + eta_l
/// slope(t+1) = slope(t) + eta_s
/// ```
#[derive(Debug, Clone)]
pub struct LocalLinearTrend<T: RealField> {
    /// Level innovation variance
    pub level_variance: T,
    /// Slope innovation variance
    pub slope_variance: T,
    /// Measurement noise variance
    pub measurement_variance: T,
}

impl<T: RealField + Float + Copy> LocalLinearTrend<T> {
    /// Creates a local-linear-trend model.
    ///
    /// # Panics
    /// Panics if any variance is negative.
    pub fn new(level_variance: T, slope_variance: T, measurement_variance: T) -> Self {
        assert!(
            level_variance >= T::zero(),
            "Level variance must be non-negative"
        );
        assert!(
            slope_variance >= T::zero(),
            "Slope variance must be non-negative"
        );
        assert!(
            measurement_variance >= T::zero(),
            "Measurement variance must be non-negative"
        );
        Self {
            level_variance,
            slope_variance,
            measurement_variance,
        }
    }
}

impl<T: RealField + Float + Copy> StateSpaceModel<T> for LocalLinearTrend<T> {
    fn state_dim(&self) -> usize {
        2
    }

    fn diffuse_dim(&self) -> usize {
        2
    }

    fn transition_matrix(&self, _pos: usize) -> DMatrix<T> {
        let one = T::one();
        let zero = T::zero();
        DMatrix::from_row_slice(2, 2, &[one, one, zero, one])
    }

    fn process_noise(&self, _pos: usize) -> DMatrix<T> {
        let mut q = DMatrix::zeros(2, 2);
        q[(0, 0)] = self.level_variance;
        q[(1, 1)] = self.slope_variance;
        q
    }

    fn loading(&self, _pos: usize) -> DVector<T> {
        let mut z = DVector::zeros(2);
        z[0] = T::one();
        z
    }

    fn measurement_variance(&self, _pos: usize) -> T {
        self.measurement_variance
    }

    fn initial_covariance(&self) -> DMatrix<T> {
        DMatrix::zeros(2, 2)
    }

    fn diffuse_constraints(&self) -> DMatrix<T> {
        DMatrix::identity(2, 2)
    }
}
