//! Forward pass: diffuse initialization followed by ordinary filtering

mod diffuse;
mod ordinary;
mod results;

pub use diffuse::{DiffuseInitializer, Phase};
pub use ordinary::{predict, update0, OrdinaryFilter};
pub use results::{DiffuseLikelihood, FilterStats, FilteringResults, StepRecord, StorageMode};

use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;

use crate::models::{self, StateSpaceModel};
use crate::{Result, SsfError};

/// Configuration of a filter run.
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions<T> {
    /// Absolute threshold below which the innovation variances `f` and `fi`
    /// are clamped to exactly zero.
    ///
    /// The clamp guards the recursions against division blow-ups near
    /// singular variances. The tolerance is *not* scaled by the data
    /// magnitude; callers filtering series of unusual scale should set it
    /// explicitly. Defaults to `sqrt(epsilon)` of the scalar type.
    pub zero_threshold: T,
    /// How much of the forward pass to retain.
    pub storage: StorageMode,
}

impl<T: RealField + Float + Copy> Default for FilterOptions<T> {
    fn default() -> Self {
        Self {
            zero_threshold: Float::sqrt(T::epsilon()),
            storage: StorageMode::Full,
        }
    }
}

/// Runs the full forward pass over `data` (NaN marks a missing observation).
///
/// Validates the model, drives the [`DiffuseInitializer`] until the diffuse
/// subspace collapses, then the [`OrdinaryFilter`] over the remainder, and
/// accumulates the likelihood along the way.
///
/// Fails with [`SsfError::DiffuseNotCollapsed`] if diffuse directions survive
/// the whole series — the model is under-identified for this data length —
/// and with [`SsfError::ModelDegeneracy`] on any NaN or negative variance.
pub fn filter<T, M>(model: &M, data: &[T], options: &FilterOptions<T>) -> Result<FilteringResults<T>>
where
    T: RealField + Float + Copy,
    M: StateSpaceModel<T> + ?Sized,
{
    let n = data.len();
    models::validate(model, n)?;

    let mut results = FilteringResults::with_capacity(n, options.storage, model.state_dim());
    let mut likelihood = DiffuseLikelihood::new();
    let mut stats = FilterStats::default();

    let mut init = DiffuseInitializer::new(model, options);
    let mut t = 0;
    while t < n && init.phase() == Phase::Diffuse {
        let (a, p, b) = if results.keeps_matrices() {
            (
                init.state().state.a.clone(),
                init.state().state.p.clone(),
                Some(init.state().b.clone()),
            )
        } else {
            (DVector::zeros(0), DMatrix::zeros(0, 0), None)
        };
        let info = init.step(data[t])?;
        accumulate(&mut likelihood, &info);
        results.push(StepRecord { a, p, b, info });
        t += 1;
    }
    if init.phase() == Phase::Diffuse {
        return Err(SsfError::DiffuseNotCollapsed {
            remaining: init.state().diffuse_dim(),
        });
    }
    results.set_end_diffuse(t);

    let (state, diffuse_stats) = init.into_parts();
    stats.absorb(&diffuse_stats);

    let mut flt = OrdinaryFilter::resume(model, state, t, options.zero_threshold);
    while t < n {
        let (a, p) = if results.keeps_matrices() {
            (flt.state().a.clone(), flt.state().p.clone())
        } else {
            (DVector::zeros(0), DMatrix::zeros(0, 0))
        };
        let info = flt.step(data[t])?;
        accumulate(&mut likelihood, &info);
        results.push(StepRecord { a, p, b: None, info });
        t += 1;
    }
    let (final_state, ordinary_stats) = flt.into_parts();
    stats.absorb(&ordinary_stats);

    results.set_final_state(final_state);
    results.set_likelihood(likelihood);
    results.set_stats(stats);
    Ok(results)
}

fn accumulate<T: RealField + Float + Copy>(
    likelihood: &mut DiffuseLikelihood<T>,
    info: &crate::types::update::UpdateInformation<T>,
) {
    if info.is_missing() {
        return;
    }
    if info.is_diffuse() {
        likelihood.add_diffuse(info.fi);
    } else if info.f > T::zero() {
        likelihood.add_ordinary(info.e, info.f);
    }
}
