/// Weighted arithmetic mean of `(x, y, weight)` samples. Weights are
/// assumed already normalised (sum to 1); callers that haven't normalised
/// should do so before calling this.
pub fn weighted_mean_xy(samples: &[(f64, f64, f64)]) -> (f64, f64) {
    let mut x = 0.0;
    let mut y = 0.0;
    for &(sx, sy, w) in samples {
        x += sx * w;
        y += sy * w;
    }
    (x, y)
}

/// Weighted circular mean of `(theta, weight)` samples:
/// `atan2(sum(w * sin theta), sum(w * cos theta))`.
pub fn weighted_circular_mean_angle(samples: &[(f64, f64)]) -> f64 {
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    for &(theta, w) in samples {
        sin_sum += w * theta.sin();
        cos_sum += w * theta.cos();
    }
    sin_sum.atan2(cos_sum)
}

/// Weighted positional variance (sum of squared distance to `mean`,
/// weighted), used by the localizer's divergence check.
pub fn weighted_positional_variance(samples: &[(f64, f64, f64)], mean: (f64, f64)) -> f64 {
    samples
        .iter()
        .map(|&(x, y, w)| w * ((x - mean.0).powi(2) + (y - mean.1).powi(2)))
        .sum()
}

/// Effective sample size `1 / sum(w_i^2)` of a set of (already normalised)
/// weights, the standard particle-filter resampling trigger metric.
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    if sum_sq == 0.0 { 0.0 } else { 1.0 / sum_sq }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weighted_mean_xy_is_plain_average_for_uniform_weights() {
        let samples = [(0.0, 0.0, 0.5), (2.0, 4.0, 0.5)];
        let (x, y) = weighted_mean_xy(&samples);
        assert_abs_diff_eq!(x, 1.0);
        assert_abs_diff_eq!(y, 2.0);
    }

    #[test]
    fn circular_mean_of_identical_angles_is_unchanged() {
        let samples = [(1.0, 0.5), (1.0, 0.5)];
        assert_abs_diff_eq!(weighted_circular_mean_angle(&samples), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn circular_mean_averages_across_the_wrap_point() {
        // angles near +pi and -pi should average close to pi, not 0
        let samples = [(std::f64::consts::PI - 0.01, 0.5), (-std::f64::consts::PI + 0.01, 0.5)];
        let mean = weighted_circular_mean_angle(&samples);
        assert!(mean.abs() > std::f64::consts::PI - 0.1);
    }

    #[test]
    fn effective_sample_size_is_n_for_uniform_weights() {
        let weights = vec![0.25; 4];
        assert_abs_diff_eq!(effective_sample_size(&weights), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn effective_sample_size_is_one_for_degenerate_weights() {
        let mut weights = vec![0.0; 4];
        weights[0] = 1.0;
        assert_abs_diff_eq!(effective_sample_size(&weights), 1.0, epsilon = 1e-9);
    }
}
