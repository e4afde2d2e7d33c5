//! Example usage of the ssfilter library
//!
//! Filters and smooths a short series with the local-level model, including a
//! stretch of missing observations.

use ssfilter::filters::{filter, FilterOptions};
use ssfilter::models::LocalLevel;
use ssfilter::smoothers::{smooth, SmootherOptions};

fn main() {
    println!("ssfilter: diffuse Kalman filtering and smoothing");
    println!("================================================\n");

    // Random-walk level observed with noise; the initial level is diffuse.
    let model = LocalLevel::new(
        0.05, // Level innovation variance
        0.5,  // Measurement noise variance
    );

    let data = [
        1.02,
        1.27,
        0.95,
        f64::NAN, // sensor outage
        f64::NAN,
        1.61,
        1.82,
        1.53,
        2.05,
        2.21,
    ];

    let results = filter(&model, &data, &FilterOptions::default()).expect("filtering failed");
    let smoothed = smooth(&model, &results, &SmootherOptions::default()).expect("smoothing failed");

    println!(
        "Diffuse phase ends at t = {}, log-likelihood = {:.4}\n",
        results.end_diffuse(),
        results.likelihood().log_likelihood()
    );

    println!("  t      y        smoothed   std.dev");
    let covariances = smoothed.covariances.as_ref().expect("variances requested");
    for (t, &y) in data.iter().enumerate() {
        let level = smoothed.states[t][0];
        let sd = covariances[t][(0, 0)].sqrt();
        if y.is_nan() {
            println!("{:3}      --      {:8.4}  {:8.4}", t, level, sd);
        } else {
            println!("{:3}  {:7.2}    {:8.4}  {:8.4}", t, y, level, sd);
        }
    }

    let residuals = results.standardized_residuals();
    let spread = residuals
        .iter()
        .filter(|r| !r.is_nan())
        .map(|r| r * r)
        .sum::<f64>()
        / results.likelihood().n_obs() as f64;
    println!("\nMean squared standardized residual: {:.4}", spread);
}
