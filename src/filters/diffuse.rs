//! Diffuse-phase filtering (square-root array algorithm)
//!
//! While diffuse directions remain, each step measures two innovation
//! variances: the finite `f = Z*P*Z^T + H` and the diffuse `fi = ||B^T Z^T||^2`.
//! When `fi > 0` the step consumes one diffuse direction: an orthogonal row
//! transform triangularizes the diffuse loading against the columns of `B`,
//! the transformed pivot column yields the diffuse gain `Ci`, and the state
//! moves by the exact-limit update
//!
//! ```text
//! a += Ci*e/fi                                       (observed steps)
//! P += (f/fi^2)*Ci*Ci^T - (Ci*C^T + C*Ci^T)/fi
//! Pi -= Ci*Ci^T/fi                                   (implicit: B loses its pivot column)
//! ```
//!
//! which is the kappa -> infinity limit of the joint gain `(C + kappa*Ci) /
//! (f + kappa*fi)`: the diffuse gain alone drives the mean, while both gains
//! shape the covariance decrease. When `fi = 0` the step degenerates to the
//! ordinary update and `B` is untouched.
//!
//! The rank reduction depends only on the loadings, so it proceeds for
//! missing observations too; missingness suppresses the innovation and the
//! mean update, nothing else.

use nalgebra::RealField;
use num_traits::Float;

use crate::filters::results::FilterStats;
use crate::filters::FilterOptions;
use crate::models::StateSpaceModel;
use crate::types::rotation::{row_givens, RowTransform};
use crate::types::state::{AugmentedState, State};
use crate::types::update::UpdateInformation;
use crate::{Result, SsfError};

/// Where the initializer stands in its two-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Diffuse directions remain; steps run the augmented recursion.
    Diffuse,
    /// The diffuse subspace is resolved; the ordinary filter takes over.
    Collapsed,
}

/// Applies the diffuse measurement update (`fi > 0`) in place.
///
/// Both gain vectors contribute to the covariance decrease; the mean moves by
/// the diffuse gain only, and only for observed steps.
pub(crate) fn update1<T: RealField + Float + Copy>(
    state: &mut State<T>,
    info: &UpdateInformation<T>,
    ci: &nalgebra::DVector<T>,
) {
    let fi_inv = T::one() / info.fi;
    state.p.ger(info.f * fi_inv * fi_inv, ci, ci, T::one());
    state.p.ger(-fi_inv, ci, &info.c, T::one());
    state.p.ger(-fi_inv, &info.c, ci, T::one());
    if !info.is_missing() {
        state.a.axpy(info.e * fi_inv, ci, T::one());
    }
}

/// Drives the diffuse phase of a filter run.
///
/// Starts in [`Phase::Diffuse`] (unless the model has no diffuse directions)
/// and switches to [`Phase::Collapsed`] the first time the constraint matrix
/// runs out of columns; the outer driver then continues with the plain
/// [`super::OrdinaryFilter`].
#[derive(Debug, Clone)]
pub struct DiffuseInitializer<'a, T: RealField, M: ?Sized> {
    model: &'a M,
    state: AugmentedState<T>,
    transform: RowTransform<T>,
    zero_threshold: T,
    pos: usize,
    phase: Phase,
    stats: FilterStats,
}

impl<'a, T, M> DiffuseInitializer<'a, T, M>
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    /// Builds the initializer from the model's initialization data.
    ///
    /// Degenerate (near-zero) constraint columns are dropped immediately; a
    /// model whose constraint matrix is entirely negligible starts collapsed.
    pub fn new(model: &'a M, options: &FilterOptions<T>) -> Self {
        let state = State::new(model.initial_state(), model.initial_covariance());
        let mut state = AugmentedState::new(state, model.diffuse_constraints());
        state.drop_negligible_columns(options.zero_threshold);
        let phase = if state.is_collapsed() {
            Phase::Collapsed
        } else {
            Phase::Diffuse
        };
        Self {
            model,
            state,
            transform: row_givens,
            zero_threshold: options.zero_threshold,
            pos: 0,
            phase,
            stats: FilterStats::default(),
        }
    }

    /// Replaces the rank-reducing orthogonal transform.
    pub fn with_transform(mut self, transform: RowTransform<T>) -> Self {
        self.transform = transform;
        self
    }

    /// Current phase of the state machine.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The current augmented (predicted) state.
    #[inline]
    pub fn state(&self) -> &AugmentedState<T> {
        &self.state
    }

    /// Next position to be processed.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consumes the initializer, yielding the finite state and counters for
    /// the ordinary continuation.
    pub(crate) fn into_parts(self) -> (State<T>, FilterStats) {
        (self.state.state, self.stats)
    }

    /// Processes one diffuse-phase step: measure, reduce, update, predict.
    ///
    /// Returns the update summary for persistence. Must not be called after
    /// the phase switched to [`Phase::Collapsed`].
    pub fn step(&mut self, y: T) -> Result<UpdateInformation<T>> {
        debug_assert_eq!(self.phase, Phase::Diffuse);
        let pos = self.pos;
        self.stats.diffuse_steps += 1;
        let z = self.model.loading(pos);

        // Diffuse loading and its squared norm.
        let mut zi = self.state.b.tr_mul(&z);
        let mut fi = zi.norm_squared();
        if Float::is_nan(fi) {
            return Err(SsfError::ModelDegeneracy { pos });
        }
        if fi != T::zero() && fi <= self.zero_threshold {
            self.stats.clamped_fi += 1;
            fi = T::zero();
        }

        let mut f =
            self.model.zvz(pos, &self.state.state.p) + self.model.measurement_variance(pos);
        if Float::is_nan(f) || f < -self.zero_threshold {
            return Err(SsfError::ModelDegeneracy { pos });
        }
        if f != T::zero() && Float::abs(f) <= self.zero_threshold {
            self.stats.clamped_f += 1;
            f = T::zero();
        }

        let c = &self.state.state.p * &z;
        let e = if Float::is_nan(y) {
            self.stats.missing += 1;
            T::nan()
        } else {
            y - self.state.state.a.dot(&z)
        };

        let ci = if fi > T::zero() {
            // Triangularize the diffuse loading; the pivot column of the
            // rotated B carries the entire direction being consumed, so
            // Ci = B*zi collapses onto pivot-column * pivot.
            (self.transform)(&mut zi, &mut self.state.b);
            let pivot = zi[0];
            let ci = self.state.b.column(0).into_owned() * pivot;
            let d = self.state.b.ncols();
            self.state.b = self.state.b.columns(1, d - 1).into_owned();
            Some(ci)
        } else {
            None
        };

        let info = UpdateInformation { e, f, fi, c, ci };
        match &info.ci {
            Some(ci) => update1(&mut self.state.state, &info, ci),
            None => super::ordinary::update0(&mut self.state.state, &info),
        }

        // Propagate a, P and B through the transition; diffuse directions are
        // not damped by process noise.
        super::ordinary::predict(self.model, pos, &mut self.state.state);
        let t = self.model.transition_matrix(pos);
        self.state.b = &t * &self.state.b;
        self.state.drop_negligible_columns(self.zero_threshold);

        self.pos += 1;
        if self.state.is_collapsed() {
            self.phase = Phase::Collapsed;
        }
        Ok(info)
    }
}
