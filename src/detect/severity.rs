use crate::dataset::{Dataset, Field};
use crate::detect::Severity;

/// Combined risk score: failure rate in percent plus one point per ten tickets.
pub fn severity_score(failure_rate: f64, ticket_count: i64) -> f64 {
    failure_rate * 100.0 + ticket_count as f64 / 10.0
}

/// Map a (failure rate, ticket count) pair to a severity label.
///
/// Thresholds are strictly greater: a score of exactly 15.0 is `High`.
/// Out-of-range input is not rejected; it just yields whatever label its
/// score falls into.
pub fn classify(failure_rate: f64, ticket_count: i64) -> Severity {
    label_for_score(severity_score(failure_rate, ticket_count))
}

pub(crate) fn label_for_score(score: f64) -> Severity {
    if score > 15.0 {
        Severity::Critical
    } else if score > 10.0 {
        Severity::High
    } else if score > 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Label every row; `None` where a row lacks failure rate or ticket count.
pub fn classify_dataset(dataset: &Dataset) -> Vec<Option<Severity>> {
    dataset
        .iter()
        .map(|row| {
            let rate = row.get(Field::FailureRate)?;
            let tickets = row.get(Field::TicketCount)?;
            Some(classify(rate, tickets.round() as i64))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MetricRow;

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(label_for_score(5.0), Severity::Low);
        assert_eq!(label_for_score(5.01), Severity::Medium);
        assert_eq!(label_for_score(10.0), Severity::Medium);
        assert_eq!(label_for_score(10.01), Severity::High);
        assert_eq!(label_for_score(15.0), Severity::High);
        assert_eq!(label_for_score(15.01), Severity::Critical);
    }

    #[test]
    fn test_ticket_count_contributes() {
        assert_eq!(classify(0.0, 50), Severity::Low);
        assert_eq!(classify(0.0, 51), Severity::Medium);
        assert_eq!(classify(0.0, 150), Severity::High);
        assert_eq!(classify(0.0, 151), Severity::Critical);
        assert_eq!(classify(0.03, 40), Severity::Medium);
    }

    #[test]
    fn test_monotonic_in_score() {
        let mut last = Severity::Low;
        for step in 0..400 {
            let label = label_for_score(step as f64 * 0.05);
            assert!(label >= last);
            last = label;
        }
    }

    #[test]
    fn test_out_of_range_input_is_deterministic() {
        assert_eq!(classify(-1.0, -20), Severity::Low);
        assert_eq!(classify(2.0, 0), Severity::Critical);
    }

    #[test]
    fn test_classify_dataset_skips_incomplete_rows() {
        let ds = Dataset::new(vec![
            MetricRow::new("a")
                .with(Field::FailureRate, 0.2)
                .with(Field::TicketCount, 3.0),
            MetricRow::new("b").with(Field::FailureRate, 0.2),
        ]);
        assert_eq!(classify_dataset(&ds), vec![Some(Severity::Critical), None]);
    }
}
