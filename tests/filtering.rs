//! Integration tests for the forward pass

mod common;

use approx::assert_relative_eq;
use common::{proper_level, trend_with_diffuse_dim, wiggly_series};
use nalgebra::{DMatrix, DVector};
use ssfilter::filters::{filter, FilterOptions, OrdinaryFilter, StorageMode};
use ssfilter::models::{LocalLevel, TimeInvariant};
use ssfilter::smoothers::{smooth, SmootherOptions};
use ssfilter::SsfError;

#[test]
fn zero_diffuse_dimension_matches_ordinary_filter() {
    // With no diffuse directions the driver must reduce to the plain Kalman
    // recursion started from (a0, P0).
    let model = proper_level(0.9, 0.3, 1.0, 1.5, 2.0);
    let data = wiggly_series(25);

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    assert_eq!(results.end_diffuse(), 0);

    let mut reference = OrdinaryFilter::new(&model, &FilterOptions::default());
    for (t, &y) in data.iter().enumerate() {
        let info = reference.step(y).unwrap();
        assert_relative_eq!(results.innovation(t), info.e, max_relative = 1e-9);
        assert_relative_eq!(results.innovation_variance(t), info.f, max_relative = 1e-9);
    }
    let final_state = results.final_state();
    assert_relative_eq!(final_state.a[0], reference.state().a[0], max_relative = 1e-9);
    assert_relative_eq!(
        final_state.p[(0, 0)],
        reference.state().p[(0, 0)],
        max_relative = 1e-9
    );
}

#[test]
fn end_diffuse_is_monotone_in_diffuse_dimension() {
    let data = wiggly_series(15);
    let mut previous = 0;
    for d0 in 0..=2 {
        let model = trend_with_diffuse_dim(d0, 0.1, 0.01, 1.0);
        let results = filter(&model, &data, &FilterOptions::default()).unwrap();
        assert!(
            results.end_diffuse() >= previous,
            "end_diffuse dropped from {} to {} at d0={}",
            previous,
            results.end_diffuse(),
            d0
        );
        previous = results.end_diffuse();
    }
}

#[test]
fn end_diffuse_equals_identification_length() {
    let data = wiggly_series(15);
    for d0 in 1..=2 {
        let model = trend_with_diffuse_dim(d0, 0.1, 0.01, 1.0);
        let results = filter(&model, &data, &FilterOptions::default()).unwrap();
        let expected = common::identification_length(&model, data.len()).unwrap();
        assert_eq!(
            results.end_diffuse(),
            expected,
            "stacked-loading rank disagrees for d0={}",
            d0
        );
    }
}

#[test]
fn all_missing_series_keeps_prior_propagation() {
    let model = TimeInvariant::new(
        DMatrix::from_element(1, 1, 0.9),
        DMatrix::from_element(1, 1, 0.2),
        DVector::from_element(1, 1.0),
        1.0,
    )
    .unwrap()
    .with_initial_state(DVector::from_element(1, 2.0))
    .unwrap()
    .with_diffuse_constraints(DMatrix::identity(1, 1))
    .unwrap();

    let n = 8;
    let gaps = vec![f64::NAN; n];
    let observed = wiggly_series(n);

    let blind = filter(&model, &gaps, &FilterOptions::default()).unwrap();
    let sighted = filter(&model, &observed, &FilterOptions::default()).unwrap();

    // Collapse timing depends on the loadings only.
    assert_eq!(blind.end_diffuse(), sighted.end_diffuse());

    // The filtered mean never saw a measurement update: pure prior propagation.
    let mut expected = 2.0;
    for t in 0..n {
        let record = blind.record(t).unwrap();
        assert_relative_eq!(record.a[0], expected, max_relative = 1e-12);
        assert!(record.info.is_missing());
        expected *= 0.9;
    }
    assert_eq!(blind.stats().missing, n);
}

#[test]
fn local_level_scenario_with_leading_gaps() {
    // Local level over y = [NaN, NaN, 1.0, 2.0, 3.5, ...], n = 20.
    let model = LocalLevel::new(0.5, 1.0);
    let mut data = vec![f64::NAN, f64::NAN, 1.0, 2.0, 3.5];
    data.extend((5..20).map(|t| 3.5 + 0.4 * (t - 4) as f64));

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();

    // The loading is non-degenerate at t = 0, so the single diffuse direction
    // collapses on the very first filtered step, leading gaps or not.
    assert_eq!(results.end_diffuse(), 1);

    // No mean update happened before the first real observation.
    for t in 0..2 {
        assert_relative_eq!(results.record(t).unwrap().a[0], 0.0, epsilon = 1e-12);
        assert!(results.record(t).unwrap().info.is_missing());
    }
    // First finite innovation appears at the first non-missing index.
    assert!(results.innovation(1).is_nan());
    assert_relative_eq!(results.innovation(2), 1.0, epsilon = 1e-12);

    let residuals = results.standardized_residuals();
    assert_eq!(residuals.len(), 19);
    assert!(residuals[0].is_nan()); // t = 1 is missing
    assert!(residuals[1].is_finite());
    assert_eq!(results.stats().missing, 2);
    assert_eq!(results.likelihood().n_obs(), 18);
    assert_eq!(results.likelihood().diffuse_steps(), 0);
}

#[test]
fn unidentified_diffuse_direction_is_fatal() {
    // A diffuse direction the measurement never loads on cannot collapse.
    let model = TimeInvariant::new(
        DMatrix::identity(2, 2),
        DMatrix::zeros(2, 2),
        DVector::from_vec(vec![1.0, 0.0]),
        1.0,
    )
    .unwrap()
    .with_diffuse_constraints(DMatrix::identity(2, 2))
    .unwrap();

    let data = wiggly_series(10);
    assert_eq!(
        filter(&model, &data, &FilterOptions::default()).unwrap_err(),
        SsfError::DiffuseNotCollapsed { remaining: 1 }
    );
}

#[test]
fn nonfinite_operator_is_a_setup_error() {
    let model = TimeInvariant::new(
        DMatrix::from_element(1, 1, 1.0),
        DMatrix::from_element(1, 1, f64::INFINITY),
        DVector::from_element(1, 1.0),
        1.0,
    )
    .unwrap();
    let data = [1.0, 2.0];
    assert_eq!(
        filter(&model, &data, &FilterOptions::default()).unwrap_err(),
        SsfError::ModelDegeneracy { pos: 0 }
    );
}

#[test]
fn light_storage_matches_full_likelihood() {
    let model = LocalLevel::new(0.2, 1.0);
    let mut data = wiggly_series(20);
    data[7] = f64::NAN;

    let full = filter(&model, &data, &FilterOptions::default()).unwrap();
    let light_options = FilterOptions {
        storage: StorageMode::Light,
        ..FilterOptions::default()
    };
    let light = filter(&model, &data, &light_options).unwrap();

    assert_eq!(light.end_diffuse(), full.end_diffuse());
    assert_relative_eq!(
        light.likelihood().log_likelihood(),
        full.likelihood().log_likelihood(),
        max_relative = 1e-12
    );
    assert!(light.record(0).is_none());
    assert_eq!(
        smooth(&model, &light, &SmootherOptions::default()).unwrap_err(),
        SsfError::SmoothingUnavailable
    );

    // Scalar summaries stay addressable in light mode.
    for t in 0..data.len() {
        let (e_full, e_light) = (full.innovation(t), light.innovation(t));
        assert!(e_full.is_nan() == e_light.is_nan());
        if !e_full.is_nan() {
            assert_relative_eq!(e_full, e_light, max_relative = 1e-12);
        }
    }
}

#[test]
fn filtered_state_rederives_the_update() {
    let model = LocalLevel::new(0.2, 1.0);
    let data = wiggly_series(6);
    let results = filter(&model, &data, &FilterOptions::default()).unwrap();

    // Predicted state at t+1 must equal the filtered state at t pushed
    // through the transition (plus process noise on the covariance).
    for t in 0..5 {
        let filtered = results.filtered_state(t).unwrap();
        let next = results.record(t + 1).unwrap();
        assert_relative_eq!(next.a[0], filtered.a[0], max_relative = 1e-10);
        assert_relative_eq!(
            next.p[(0, 0)],
            filtered.p[(0, 0)] + 0.2,
            max_relative = 1e-10
        );
    }
}
