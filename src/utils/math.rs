/// Standard normal cumulative distribution function.
pub fn normal_probability(a: f64) -> f64 {
    0.5 * (1.0 + libm::erf(a / (2.0f64).sqrt()))
}

/// Two-sided tail probability of a standard normal deviate of magnitude `z`.
pub fn two_sided_tail(z: f64) -> f64 {
    2.0 * (1.0 - normal_probability(z.abs()))
}

/// Integrated autocorrelation time from the ratio of the binned to the
/// naive standard error. Noisy estimates can come out slightly negative.
pub fn autocorrelation_time(naive: f64, binned: f64) -> Option<f64> {
    if naive == 0.0 {
        return None;
    }
    let ratio = binned / naive;
    Some(0.5 * (ratio * ratio - 1.0))
}

/// Standard error of the mean from running sums, assuming uncorrelated
/// samples. `None` with fewer than two samples.
pub fn standard_error(count: u64, sum: f64, sum_sq: f64) -> Option<f64> {
    if count < 2 {
        return None;
    }
    let n = count as f64;
    let mean = sum / n;
    let variance = ((sum_sq / n - mean * mean) * n / (n - 1.0)).max(0.0);
    Some((variance / n).sqrt())
}
