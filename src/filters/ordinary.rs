//! Ordinary (post-collapse) Kalman recursion
//!
//! The classic scalar-measurement predict/update cycle. Its update step,
//! `update0`, is reused unchanged by the diffuse phase for the finite-variance
//! contribution.

use nalgebra::RealField;
use num_traits::Float;

use crate::filters::results::FilterStats;
use crate::filters::FilterOptions;
use crate::models::StateSpaceModel;
use crate::types::state::State;
use crate::types::update::UpdateInformation;
use crate::{Result, SsfError};

/// Applies the ordinary measurement update in place.
///
/// `a += C*e/f`, `P -= C*C^T/f`. A missing observation or a zero innovation
/// variance leaves the state untouched.
pub fn update0<T: RealField + Float + Copy>(state: &mut State<T>, info: &UpdateInformation<T>) {
    if info.is_missing() || info.f <= T::zero() {
        return;
    }
    let f_inv = T::one() / info.f;
    state.p.ger(-f_inv, &info.c, &info.c, T::one());
    state.a.axpy(info.e * f_inv, &info.c, T::one());
}

/// Applies the prediction step in place: `a = T*a`, `P = T*P*T^T + R*Q*R^T`.
pub fn predict<T, M>(model: &M, pos: usize, state: &mut State<T>)
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    model.apply_transition(pos, &mut state.a);
    model.apply_transition_cov(pos, &mut state.p);
    state.p += model.process_noise(pos);
    state.symmetrize();
}

/// The ordinary Kalman filter over a state-space model.
///
/// Usable standalone for models without diffuse directions, and as the
/// post-collapse half of the diffuse run. Holds only a cursor into the series
/// and the current state; per-step summaries are returned to the caller.
#[derive(Debug, Clone)]
pub struct OrdinaryFilter<'a, T: RealField, M: ?Sized> {
    model: &'a M,
    state: State<T>,
    zero_threshold: T,
    pos: usize,
    stats: FilterStats,
}

impl<'a, T, M> OrdinaryFilter<'a, T, M>
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    /// Starts a filter from the model's finite initialization `(a0, Pf0)`.
    ///
    /// Diffuse constraints are ignored here; use [`crate::filters::filter`]
    /// for models with a diffuse initial state.
    pub fn new(model: &'a M, options: &FilterOptions<T>) -> Self {
        let state = State::new(model.initial_state(), model.initial_covariance());
        Self::resume(model, state, 0, options.zero_threshold)
    }

    /// Resumes filtering from an existing state at `pos`.
    pub(crate) fn resume(model: &'a M, state: State<T>, pos: usize, zero_threshold: T) -> Self {
        Self {
            model,
            state,
            zero_threshold,
            pos,
            stats: FilterStats::default(),
        }
    }

    /// The current (predicted) state.
    #[inline]
    pub fn state(&self) -> &State<T> {
        &self.state
    }

    /// Next position to be processed.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Numerical event counters so far.
    #[inline]
    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Consumes the filter, yielding the final predicted state and counters.
    pub(crate) fn into_parts(self) -> (State<T>, FilterStats) {
        (self.state, self.stats)
    }

    /// Processes the observation at the current position: measure, update,
    /// predict. Returns the update summary for persistence.
    pub fn step(&mut self, y: T) -> Result<UpdateInformation<T>> {
        let pos = self.pos;
        let z = self.model.loading(pos);
        let mut f = self.model.zvz(pos, &self.state.p) + self.model.measurement_variance(pos);
        if Float::is_nan(f) || f < -self.zero_threshold {
            return Err(SsfError::ModelDegeneracy { pos });
        }
        if f != T::zero() && Float::abs(f) <= self.zero_threshold {
            self.stats.clamped_f += 1;
            f = T::zero();
        }
        let c = &self.state.p * &z;
        let e = if Float::is_nan(y) {
            self.stats.missing += 1;
            T::nan()
        } else {
            y - self.state.a.dot(&z)
        };
        let info = UpdateInformation {
            e,
            f,
            fi: T::zero(),
            c,
            ci: None,
        };
        update0(&mut self.state, &info);
        predict(self.model, pos, &mut self.state);
        self.pos += 1;
        Ok(info)
    }
}
