//! Statistical helpers shared by the simulators.
//!
//! Provides the normal CDF used to map correlated normals onto uniforms,
//! linear-interpolated percentiles for trial distributions, and the Wilson
//! score interval used to report win-rate uncertainty.

use crate::odds::{MAX_PROBABILITY, MIN_PROBABILITY};

/// Hard-clamps a simulated probability into `[0.01, 0.95]`.
///
/// NaN is mapped to the lower bound so it can never reach a comparison.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return MIN_PROBABILITY;
    }
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Standard normal CDF approximation.
///
/// Uses Abramowitz and Stegun formula 26.2.17, accurate to about 7.5e-8.
#[must_use]
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - standard_normal_cdf(-x);
    }

    let b1 = 0.319_381_530;
    let b2 = -0.356_563_782;
    let b3 = 1.781_477_937;
    let b4 = -1.821_255_978;
    let b5 = 1.330_274_429;
    let p = 0.231_641_9;

    let t = 1.0 / (1.0 + p * x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let pdf = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    1.0 - pdf * (b1 * t + b2 * t2 + b3 * t3 + b4 * t4 + b5 * t5)
}

/// Percentile of an ascending-sorted slice using linear interpolation.
///
/// `p` is a fraction in `[0, 1]`. The rank is `p × (n − 1)`; values between
/// two ranks are interpolated. Returns 0.0 for an empty slice.
#[must_use]
pub fn percentile_linear(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Calculates the Wilson score confidence interval for a proportion.
///
/// # Arguments
/// * `wins` - Number of successes
/// * `n` - Total number of trials
/// * `z` - Z-score for the confidence level (1.96 for 95%)
///
/// # Returns
/// Tuple of (lower_bound, upper_bound); `(0.0, 0.0)` when `n` is zero.
#[must_use]
pub fn wilson_ci(wins: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }

    let n_f = n as f64;
    let p_hat = wins as f64 / n_f;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n_f;
    let center = p_hat + z2 / (2.0 * n_f);
    let margin = z * (p_hat * (1.0 - p_hat) / n_f + z2 / (4.0 * n_f * n_f)).sqrt();

    let lower = ((center - margin) / denominator).max(0.0);
    let upper = ((center + margin) / denominator).min(1.0);

    (lower, upper)
}

/// Mean and population standard deviation of a slice.
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
