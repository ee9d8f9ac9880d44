//! Self-contained statistics over fixed-length numeric traces.
//!
//! The side-channel scenario needs a Pearson correlation between short
//! energy traces; nothing here warrants a numeric library.

/// Variance below this is treated as a flat trace.
pub const VARIANCE_FLOOR: f64 = 1e-6;

/// Arithmetic mean. Returns 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Pearson correlation coefficient between two equal-length traces.
///
/// Returns `None` if the lengths differ or either trace is flat (standard
/// deviation at or below [`VARIANCE_FLOOR`]); correlation is undefined
/// there and the caller must not treat it as signal.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (sd_a, sd_b) = (std_dev(a), std_dev(b));
    if sd_a <= VARIANCE_FLOOR || sd_b <= VARIANCE_FLOOR {
        return None;
    }
    let (mean_a, mean_b) = (mean(a), mean(b));
    let cov = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / a.len() as f64;
    Some(cov / (sd_a * sd_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn perfectly_correlated_traces() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn anti_correlated_traces() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0];
        assert!((pearson(&a, &b).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_trace_has_no_correlation() {
        let a = [1.0, 1.0, 1.0];
        let b = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&a, &b), None);
    }

    #[test]
    fn mismatched_lengths_have_no_correlation() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }
}
