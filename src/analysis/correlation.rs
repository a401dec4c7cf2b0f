use crate::dataset::{Dataset, Field};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Pearson coefficient with its two-sided significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub coefficient: f64,
    pub p_value: f64,
    /// Number of complete pairs that went into the estimate.
    pub pairs: usize,
}

impl CorrelationResult {
    /// Returned whenever the input cannot support an estimate.
    pub const NEUTRAL: Self = Self {
        coefficient: 0.0,
        p_value: 1.0,
        pairs: 0,
    };

    fn neutral(pairs: usize) -> Self {
        Self { pairs, ..Self::NEUTRAL }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Correlate two columns of a dataset.
///
/// Rows missing either field are dropped. Fewer than two complete pairs, or
/// a column with no variance, yields [`CorrelationResult::NEUTRAL`].
pub fn correlate(dataset: &Dataset, field_a: Field, field_b: Field) -> CorrelationResult {
    let (xs, ys): (Vec<f64>, Vec<f64>) = dataset
        .iter()
        .filter_map(|row| Some((row.get(field_a)?, row.get(field_b)?)))
        .unzip();
    pearson(&xs, &ys)
}

/// Pearson correlation over two equally long slices.
pub fn pearson(xs: &[f64], ys: &[f64]) -> CorrelationResult {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return CorrelationResult::neutral(n);
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return CorrelationResult::neutral(n);
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    if !r.is_finite() {
        return CorrelationResult::neutral(n);
    }

    CorrelationResult {
        coefficient: r,
        p_value: two_sided_p(r, n),
        pairs: n,
    }
}

/// Significance of `r` under H0: rho = 0, via Student's t with n-2 dof.
fn two_sided_p(r: f64, n: usize) -> f64 {
    // two points always fit a line exactly; there is no evidence either way
    if n <= 2 {
        return 1.0;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let dof = (n - 2) as f64;
    let t = r * (dof / (1.0 - r * r)).sqrt();
    StudentsT::new(0.0, 1.0, dof)
        .map(|dist| (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MetricRow;

    fn towers(pairs: &[(f64, f64)]) -> Dataset {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (rate, tickets))| {
                MetricRow::new(format!("CT-{:04}", i + 1))
                    .with(Field::FailureRate, *rate)
                    .with(Field::TicketCount, *tickets)
            })
            .collect()
    }

    #[test]
    fn test_too_few_pairs_is_neutral() {
        let single = towers(&[(0.02, 12.0)]);
        let r = correlate(&single, Field::FailureRate, Field::TicketCount);
        assert_eq!((r.coefficient, r.p_value), (0.0, 1.0));

        // one field entirely missing
        let ds = towers(&[(0.02, 12.0), (0.04, 20.0), (0.05, 31.0)]);
        let r = correlate(&ds, Field::FailureRate, Field::Sentiment);
        assert_eq!((r.coefficient, r.p_value), (0.0, 1.0));
        assert_eq!(r.pairs, 0);

        assert_eq!(correlate(&Dataset::default(), Field::FailureRate, Field::TicketCount).p_value, 1.0);
    }

    #[test]
    fn test_symmetric() {
        let ds = towers(&[(0.01, 9.0), (0.03, 14.0), (0.02, 17.0), (0.08, 22.0), (0.05, 15.0)]);
        let ab = correlate(&ds, Field::FailureRate, Field::TicketCount);
        let ba = correlate(&ds, Field::TicketCount, Field::FailureRate);
        assert_eq!(ab.coefficient, ba.coefficient);
        assert_eq!(ab.p_value, ba.p_value);
    }

    #[test]
    fn test_perfect_linear_relation() {
        let ds = towers(&[(0.01, 11.0), (0.02, 12.0), (0.03, 13.0), (0.04, 14.0)]);
        let r = correlate(&ds, Field::FailureRate, Field::TicketCount);
        assert!((r.coefficient - 1.0).abs() < 1e-12);
        assert!(r.p_value < 1e-6);
        assert!(r.is_significant(0.05));
    }

    #[test]
    fn test_known_p_value() {
        // r = 0.8 over 5 points: t = 0.8 * sqrt(3 / 0.36) = 2.3094, p ~ 0.1041
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [1.0, 3.0, 2.0, 5.0, 4.0];
        let r = pearson(&xs, &ys);
        assert!((r.coefficient - 0.8).abs() < 1e-12);
        assert!((r.p_value - 0.1041).abs() < 1e-3, "p = {}", r.p_value);
    }

    #[test]
    fn test_constant_column_is_neutral() {
        let r = pearson(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]);
        assert_eq!(r.coefficient, 0.0);
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.pairs, 3);
    }

    #[test]
    fn test_two_pairs_not_significant() {
        let r = pearson(&[1.0, 2.0], &[3.0, 7.0]);
        assert!((r.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_rows_with_gaps_are_dropped() {
        let mut rows: Vec<MetricRow> = towers(&[(0.01, 10.0), (0.02, 20.0), (0.03, 30.0)])
            .rows()
            .to_vec();
        rows.push(MetricRow::new("gap").with(Field::FailureRate, 0.9));
        let r = correlate(&Dataset::new(rows), Field::FailureRate, Field::TicketCount);
        assert_eq!(r.pairs, 3);
        assert!((r.coefficient - 1.0).abs() < 1e-12);
    }
}
