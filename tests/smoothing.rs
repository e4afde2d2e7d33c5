//! Integration tests for the backward pass

mod common;

use approx::assert_relative_eq;
use common::{line_series, trend_with_diffuse_dim, wiggly_series};
use ssfilter::filters::{filter, FilterOptions};
use ssfilter::models::{LocalLevel, LocalLinearTrend};
use ssfilter::smoothers::{smooth, SmootherOptions};

#[test]
fn noise_free_round_trip_reconstructs_the_state() {
    // Exact line through a noise-free local linear trend: after the two
    // diffuse steps identify level and slope, every state is reproduced
    // exactly and the smoothed variance vanishes.
    let model = LocalLinearTrend::new(0.0, 0.0, 0.0);
    let data = line_series(12, 2.0, 0.5);

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    assert_eq!(results.end_diffuse(), 2);

    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();
    let covariances = smoothed.covariances.as_ref().unwrap();
    for t in 0..data.len() {
        assert_relative_eq!(smoothed.states[t][0], data[t], epsilon = 1e-8);
        assert_relative_eq!(smoothed.states[t][1], 0.5, epsilon = 1e-8);
        assert!(
            covariances[t].norm() < 1e-8,
            "smoothed variance at {} was {}",
            t,
            covariances[t].norm()
        );
    }

    // The filtered (predicted) states are exact as well once identified.
    for t in 2..data.len() {
        let record = results.record(t).unwrap();
        assert_relative_eq!(record.a[0], data[t], epsilon = 1e-8);
        assert_relative_eq!(record.a[1], 0.5, epsilon = 1e-8);
    }
}

#[test]
fn smoothed_covariances_are_symmetric_and_psd() {
    let model = LocalLinearTrend::new(0.1, 0.01, 1.0);
    let mut data = wiggly_series(30);
    data[4] = f64::NAN;
    data[17] = f64::NAN;
    data[18] = f64::NAN;

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();

    for (t, v) in smoothed.covariances.as_ref().unwrap().iter().enumerate() {
        let asym = (v - v.transpose()).norm();
        assert!(asym < 1e-10, "asymmetry {} at {}", asym, t);
        for lambda in v.symmetric_eigenvalues().iter() {
            assert!(*lambda >= -1e-8, "eigenvalue {} at {}", lambda, t);
        }
    }
}

#[test]
fn smoothing_never_increases_uncertainty() {
    let model = LocalLevel::new(0.3, 1.0);
    let data = wiggly_series(25);

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();
    let covariances = smoothed.covariances.as_ref().unwrap();

    for t in results.end_diffuse()..data.len() {
        let filtered = results.filtered_state(t).unwrap();
        assert!(
            covariances[t][(0, 0)] <= filtered.p[(0, 0)] + 1e-10,
            "smoothed variance exceeds filtered at {}",
            t
        );
    }
}

#[test]
fn missing_interior_point_is_interpolated() {
    let model = LocalLevel::new(0.05, 0.25);
    let mut data = wiggly_series(15);
    data[7] = f64::NAN;

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();

    let lo = smoothed.states[6][0].min(smoothed.states[8][0]);
    let hi = smoothed.states[6][0].max(smoothed.states[8][0]);
    let mid = smoothed.states[7][0];
    assert!(
        mid >= lo - 0.2 && mid <= hi + 0.2,
        "interpolated level {} outside [{}, {}]",
        mid,
        lo,
        hi
    );

    // The gap has more smoothed uncertainty than its observed neighbours.
    let covariances = smoothed.covariances.as_ref().unwrap();
    assert!(covariances[7][(0, 0)] > covariances[6][(0, 0)]);
    assert!(covariances[7][(0, 0)] > covariances[8][(0, 0)]);
}

#[test]
fn all_missing_series_smooths_to_the_prior() {
    let model = LocalLevel::new(0.1, 1.0);
    let data = vec![f64::NAN; 6];

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();

    // No information anywhere: the smoothed mean is the propagated prior.
    for t in 0..data.len() {
        assert_relative_eq!(smoothed.states[t][0], 0.0, epsilon = 1e-12);
    }
}

#[test]
fn variance_rescaling_multiplies_by_the_estimated_scale() {
    let model = LocalLevel::new(0.2, 1.0);
    let data = wiggly_series(20);

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    let scale = results.likelihood().scale().unwrap();
    assert!(scale > 0.0);

    let plain = smooth(&model, &results, &SmootherOptions::default()).unwrap();
    let rescaled = smooth(
        &model,
        &results,
        &SmootherOptions {
            rescale_variances: true,
            ..SmootherOptions::default()
        },
    )
    .unwrap();

    for t in 0..data.len() {
        let v0 = plain.covariances.as_ref().unwrap()[t][(0, 0)];
        let v1 = rescaled.covariances.as_ref().unwrap()[t][(0, 0)];
        assert_relative_eq!(v1, v0 * scale, max_relative = 1e-12);
    }
}

#[test]
fn means_only_smoothing_skips_covariances() {
    let model = LocalLevel::new(0.2, 1.0);
    let data = wiggly_series(10);
    let results = filter(&model, &data, &FilterOptions::default()).unwrap();

    let options = SmootherOptions {
        variances: false,
        ..SmootherOptions::default()
    };
    let smoothed = smooth(&model, &results, &options).unwrap();
    assert!(smoothed.covariances.is_none());

    // Means agree with the full run.
    let full = smooth(&model, &results, &SmootherOptions::default()).unwrap();
    for t in 0..data.len() {
        assert_relative_eq!(smoothed.states[t][0], full.states[t][0], max_relative = 1e-12);
    }
}

#[test]
fn partially_diffuse_trend_smooths_against_reference() {
    // One diffuse direction (the level), slope anchored by a proper prior of
    // zero variance at zero: the smoothed slope must stay at its known value.
    let model = trend_with_diffuse_dim(1, 0.1, 0.0, 1.0);
    let data = line_series(12, 4.0, 0.0);

    let results = filter(&model, &data, &FilterOptions::default()).unwrap();
    assert_eq!(results.end_diffuse(), 1);

    let smoothed = smooth(&model, &results, &SmootherOptions::default()).unwrap();
    for t in 0..data.len() {
        assert_relative_eq!(smoothed.states[t][1], 0.0, epsilon = 1e-9);
    }
    // Constant data with a constant model: the smoothed level hugs 4.
    for t in 0..data.len() {
        assert!((smoothed.states[t][0] - 4.0).abs() < 0.5);
    }
}
