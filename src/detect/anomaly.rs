/// Default z-score cut-off for flagging a value.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Z-score of every element against the whole series.
///
/// A constant series has no defined z-scores; every element reports 0.
pub fn z_scores(series: &[f64]) -> Vec<f64> {
    let m = mean(series);
    let std = population_std(series, m);
    if std == 0.0 || !std.is_finite() {
        return vec![0.0; series.len()];
    }
    series.iter().map(|&x| (x - m) / std).collect()
}

/// Flag every element whose |z| exceeds `threshold`.
///
/// Mean and standard deviation are computed once over the full series, so
/// the flags must be recomputed whenever the series changes.
pub fn detect(series: &[f64], threshold: f64) -> Vec<bool> {
    z_scores(series)
        .into_iter()
        .map(|z| z.abs() > threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_scores_use_population_std() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mean(&values), 3.0);
        // population variance of 1..5 is 2.0
        assert_eq!(population_std(&values, 3.0), 2.0_f64.sqrt());
        let z = z_scores(&values);
        assert!((z[4] - 2.0 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((z[0] + z[4]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        let values = [5.0; 5];
        assert_eq!(detect(&values, 3.0), vec![false; 5]);
        assert_eq!(detect(&values, 0.0), vec![false; 5]);
        assert_eq!(z_scores(&values), vec![0.0; 5]);
    }

    #[test]
    fn test_single_spike_is_flagged() {
        let mut values = vec![1.0; 9];
        values.push(100.0);
        let flags = detect(&values, 2.0);
        assert_eq!(flags.len(), 10);
        assert!(flags[9]);
        assert!(flags[..9].iter().all(|f| !f));
    }

    #[test]
    fn test_negative_deviation_is_flagged() {
        let mut values = vec![50.0; 19];
        values.push(0.0);
        let flags = detect(&values, DEFAULT_Z_THRESHOLD);
        assert!(flags[19]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn test_empty_series() {
        assert!(detect(&[], DEFAULT_Z_THRESHOLD).is_empty());
        assert!(z_scores(&[]).is_empty());
    }
}
