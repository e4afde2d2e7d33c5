//! Per-step measurement-update summaries

use nalgebra::{DVector, RealField};
use num_traits::Float;

/// Everything a single filtering step learned from (or about) the observation.
///
/// `e` carries IEEE NaN when the observation is missing — missingness is a
/// first-class value here, never an error. `ci` is `Some` exactly when the
/// step still saw a diffuse direction (`fi > 0`); the `Option` is the tag
/// that selects between the ordinary and the diffuse update formulas.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInformation<T: RealField> {
    /// Innovation `y - Z*a` (NaN if the observation is missing)
    pub e: T,
    /// Finite innovation variance `Z*P*Z^T + H`, clamped to be >= 0
    pub f: T,
    /// Diffuse innovation variance `||B^T Z^T||^2`, clamped to be >= 0
    pub fi: T,
    /// Finite gain vector `P*Z^T` (length m)
    pub c: DVector<T>,
    /// Diffuse gain vector `Pi*Z^T` (length m), present only while `fi > 0`
    pub ci: Option<DVector<T>>,
}

impl<T: RealField + Float + Copy> UpdateInformation<T> {
    /// Returns true if the observation at this step was missing.
    #[inline]
    pub fn is_missing(&self) -> bool {
        Float::is_nan(self.e)
    }

    /// Returns true if this step consumed a diffuse direction.
    #[inline]
    pub fn is_diffuse(&self) -> bool {
        self.ci.is_some()
    }

    /// Standardized residual `e / sqrt(f)`, if defined at this step.
    ///
    /// Returns `None` for missing observations, diffuse steps and steps with
    /// zero innovation variance.
    pub fn standardized(&self) -> Option<T> {
        if self.is_missing() || self.is_diffuse() || self.f <= T::zero() {
            None
        } else {
            Some(self.e / Float::sqrt(self.f))
        }
    }
}
