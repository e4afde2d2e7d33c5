//! Forward-pass storage bridging filtering and smoothing
//!
//! Arena-style: a flat, pre-sized array of plain value records indexed by
//! position. Each slot is written exactly once during the forward pass and
//! read arbitrarily (including back to front) during the backward pass.

use alloc::vec::Vec;

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use crate::types::state::State;
use crate::types::update::UpdateInformation;
use crate::{Result, SsfError};

// ============================================================================
// Storage mode
// ============================================================================

/// How much of the forward pass to retain.
///
/// Likelihood evaluation inside an optimizer loop does not need the per-step
/// matrices; `Light` keeps only the scalar summaries. Smoothing requires
/// `Full` and fails fast otherwise — the trade-off is an explicit
/// configuration choice, never a silent behavior change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Retain predicted states, covariances and diffuse constraints.
    #[default]
    Full,
    /// Retain scalar update summaries only.
    Light,
}

// ============================================================================
// Records
// ============================================================================

/// One slot of the forward pass: the predicted quantities in effect at `t`
/// plus the update summary computed there.
#[derive(Debug, Clone)]
pub struct StepRecord<T: RealField> {
    /// Predicted mean `a(t|t-1)`
    pub a: DVector<T>,
    /// Predicted finite covariance `P(t|t-1)`
    pub p: DMatrix<T>,
    /// Diffuse constraint matrix in effect at `t` (diffuse prefix only)
    pub b: Option<DMatrix<T>>,
    /// Measurement-update summary
    pub info: UpdateInformation<T>,
}

#[derive(Debug, Clone)]
struct LightRecord<T> {
    e: T,
    f: T,
    fi: T,
}

#[derive(Debug, Clone)]
enum Storage<T: RealField> {
    Full(Vec<StepRecord<T>>),
    Light(Vec<LightRecord<T>>),
}

// ============================================================================
// Likelihood
// ============================================================================

/// Accumulated Gaussian log-likelihood with the diffuse-phase adjustment.
///
/// Ordinary steps contribute `-0.5*(ln f + e^2/f)`; steps that consumed a
/// diffuse direction contribute the orthogonal-transform determinant term
/// `-0.5*ln fi` instead. The parameter-independent `-n/2*ln(2*pi)` constant
/// is not included.
#[derive(Debug, Clone)]
pub struct DiffuseLikelihood<T> {
    n_obs: usize,
    diffuse_steps: usize,
    sum_log_f: T,
    ssq: T,
    diffuse_correction: T,
}

impl<T: RealField + Float + Copy> DiffuseLikelihood<T> {
    pub(crate) fn new() -> Self {
        Self {
            n_obs: 0,
            diffuse_steps: 0,
            sum_log_f: T::zero(),
            ssq: T::zero(),
            diffuse_correction: T::zero(),
        }
    }

    pub(crate) fn add_ordinary(&mut self, e: T, f: T) {
        self.n_obs += 1;
        self.sum_log_f += Float::ln(f);
        self.ssq += e * e / f;
    }

    pub(crate) fn add_diffuse(&mut self, fi: T) {
        self.diffuse_steps += 1;
        self.diffuse_correction += Float::ln(fi);
    }

    /// Number of non-missing observations that contributed an ordinary term.
    #[inline]
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Number of non-missing observations absorbed by the diffuse phase.
    #[inline]
    pub fn diffuse_steps(&self) -> usize {
        self.diffuse_steps
    }

    /// The log-likelihood `sum -0.5*(ln f + e^2/f)` plus the diffuse
    /// adjustment `-0.5 * sum ln fi`.
    pub fn log_likelihood(&self) -> T {
        let half = T::from_f64(0.5).unwrap();
        -half * (self.sum_log_f + self.ssq) - half * self.diffuse_correction
    }

    /// Concentrated innovation-variance scale `ssq / n_obs`, if any ordinary
    /// observation contributed.
    pub fn scale(&self) -> Option<T> {
        if self.n_obs == 0 {
            None
        } else {
            Some(self.ssq / T::from_usize(self.n_obs).unwrap())
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters describing numerical events of a forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Finite variances clamped to zero by the threshold
    pub clamped_f: usize,
    /// Diffuse variances clamped to zero by the threshold
    pub clamped_fi: usize,
    /// Missing observations encountered
    pub missing: usize,
    /// Steps processed while a diffuse direction remained
    pub diffuse_steps: usize,
}

impl FilterStats {
    /// Folds another counter set into this one.
    pub(crate) fn absorb(&mut self, other: &FilterStats) {
        self.clamped_f += other.clamped_f;
        self.clamped_fi += other.clamped_fi;
        self.missing += other.missing;
        self.diffuse_steps += other.diffuse_steps;
    }

    /// Returns true if any variance had to be clamped.
    pub fn has_issues(&self) -> bool {
        self.clamped_f > 0 || self.clamped_fi > 0
    }
}

// ============================================================================
// Filtering results
// ============================================================================

/// Per-step output of the forward pass.
///
/// Owned by exactly one filtering/smoothing run; slots hold the *predicted*
/// (pre-update) state at each position together with the update summary.
#[derive(Debug, Clone)]
pub struct FilteringResults<T: RealField> {
    n: usize,
    end_diffuse: usize,
    storage: Storage<T>,
    final_state: State<T>,
    likelihood: DiffuseLikelihood<T>,
    stats: FilterStats,
}

impl<T: RealField + Float + Copy> FilteringResults<T> {
    pub(crate) fn with_capacity(n: usize, mode: StorageMode, state_dim: usize) -> Self {
        let storage = match mode {
            StorageMode::Full => Storage::Full(Vec::with_capacity(n)),
            StorageMode::Light => Storage::Light(Vec::with_capacity(n)),
        };
        Self {
            n,
            end_diffuse: 0,
            storage,
            final_state: State::zeros(state_dim),
            likelihood: DiffuseLikelihood::new(),
            stats: FilterStats::default(),
        }
    }

    pub(crate) fn push(&mut self, record: StepRecord<T>) {
        match &mut self.storage {
            Storage::Full(steps) => steps.push(record),
            Storage::Light(steps) => steps.push(LightRecord {
                e: record.info.e,
                f: record.info.f,
                fi: record.info.fi,
            }),
        }
    }

    pub(crate) fn set_end_diffuse(&mut self, end_diffuse: usize) {
        self.end_diffuse = end_diffuse;
    }

    pub(crate) fn set_final_state(&mut self, state: State<T>) {
        self.final_state = state;
    }

    pub(crate) fn set_likelihood(&mut self, likelihood: DiffuseLikelihood<T>) {
        self.likelihood = likelihood;
    }

    pub(crate) fn set_stats(&mut self, stats: FilterStats) {
        self.stats = stats;
    }

    /// Whether the storage keeps per-step matrices.
    pub(crate) fn keeps_matrices(&self) -> bool {
        matches!(self.storage, Storage::Full(_))
    }

    /// Series length.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Returns true for an empty series.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// First position processed with diffuse dimension zero.
    #[inline]
    pub fn end_diffuse(&self) -> usize {
        self.end_diffuse
    }

    /// Storage mode the run was configured with.
    pub fn mode(&self) -> StorageMode {
        match self.storage {
            Storage::Full(_) => StorageMode::Full,
            Storage::Light(_) => StorageMode::Light,
        }
    }

    /// Full record at `t`, if the storage keeps matrices.
    pub fn record(&self, t: usize) -> Option<&StepRecord<T>> {
        match &self.storage {
            Storage::Full(steps) => steps.get(t),
            Storage::Light(_) => None,
        }
    }

    /// Innovation at `t` (NaN if missing).
    pub fn innovation(&self, t: usize) -> T {
        match &self.storage {
            Storage::Full(steps) => steps[t].info.e,
            Storage::Light(steps) => steps[t].e,
        }
    }

    /// Finite innovation variance at `t`.
    pub fn innovation_variance(&self, t: usize) -> T {
        match &self.storage {
            Storage::Full(steps) => steps[t].info.f,
            Storage::Light(steps) => steps[t].f,
        }
    }

    /// Diffuse innovation variance at `t`.
    pub fn diffuse_variance(&self, t: usize) -> T {
        match &self.storage {
            Storage::Full(steps) => steps[t].info.fi,
            Storage::Light(steps) => steps[t].fi,
        }
    }

    /// One-step-ahead prediction `a(n|n-1), P(n|n-1)` after the last step.
    #[inline]
    pub fn final_state(&self) -> &State<T> {
        &self.final_state
    }

    /// Accumulated likelihood of the run.
    #[inline]
    pub fn likelihood(&self) -> &DiffuseLikelihood<T> {
        &self.likelihood
    }

    /// Numerical event counters of the run.
    #[inline]
    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Standardized residuals `e/sqrt(f)` over the ordinary suffix.
    ///
    /// One entry per `t in [end_diffuse, n)`; missing observations and
    /// zero-variance steps yield NaN.
    pub fn standardized_residuals(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.n - self.end_diffuse);
        for t in self.end_diffuse..self.n {
            let e = self.innovation(t);
            let f = self.innovation_variance(t);
            if Float::is_nan(e) || f <= T::zero() {
                out.push(T::nan());
            } else {
                out.push(e / Float::sqrt(f));
            }
        }
        out
    }

    /// Re-derives the updated (`t|t`) state from the stored record.
    ///
    /// Fails with [`SsfError::SmoothingUnavailable`] in light mode.
    pub fn filtered_state(&self, t: usize) -> Result<State<T>> {
        let record = self.record(t).ok_or(SsfError::SmoothingUnavailable)?;
        let mut state = State::new(record.a.clone(), record.p.clone());
        match &record.info.ci {
            Some(ci) => super::diffuse::update1(&mut state, &record.info, ci),
            None => super::ordinary::update0(&mut state, &record.info),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(e: f64, f: f64) -> StepRecord<f64> {
        StepRecord {
            a: DVector::zeros(1),
            p: DMatrix::zeros(1, 1),
            b: None,
            info: UpdateInformation {
                e,
                f,
                fi: 0.0,
                c: DVector::zeros(1),
                ci: None,
            },
        }
    }

    #[test]
    fn test_light_mode_drops_matrices() {
        let mut results = FilteringResults::with_capacity(2, StorageMode::Light, 1);
        results.push(record(1.0, 4.0));
        results.push(record(f64::NAN, 4.0));
        assert!(results.record(0).is_none());
        assert!((results.innovation(0) - 1.0).abs() < 1e-12);
        assert!(results.filtered_state(0).is_err());
    }

    #[test]
    fn test_standardized_residuals() {
        let mut results = FilteringResults::with_capacity(2, StorageMode::Full, 1);
        results.push(record(2.0, 4.0));
        results.push(record(f64::NAN, 4.0));
        let resid = results.standardized_residuals();
        assert!((resid[0] - 1.0).abs() < 1e-12);
        assert!(resid[1].is_nan());
    }

    #[test]
    fn test_likelihood_accumulation() {
        let mut ld = DiffuseLikelihood::<f64>::new();
        ld.add_ordinary(1.0, 2.0);
        ld.add_ordinary(-1.0, 2.0);
        ld.add_diffuse(4.0);
        let expected = -0.5 * (2.0 * (2.0_f64).ln() + 1.0) - 0.5 * (4.0_f64).ln();
        assert!((ld.log_likelihood() - expected).abs() < 1e-12);
        assert!((ld.scale().unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(ld.n_obs(), 2);
        assert_eq!(ld.diffuse_steps(), 1);
    }
}
