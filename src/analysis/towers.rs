//! Single-tower lookup and filtering over the tower dataset.

use crate::dataset::{Dataset, Field, MetricRow};
use crate::detect::{classify, Severity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tower last serviced more than this many days ago is due for maintenance.
pub const MAINTENANCE_DUE_DAYS: i64 = 60;

pub const CRITICAL_STATUS: &str = "Critical";
const UNKNOWN_STATUS: &str = "Unknown";

/// Map color for an operational status.
pub fn status_color(status: &str) -> &'static str {
    match status {
        "Operational" => "#10B981",
        "Warning" => "#F59E0B",
        "Critical" => "#EF4444",
        _ => "#6B7280",
    }
}

/// Row filter for tower listings. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TowerFilter {
    pub region: Option<String>,
    pub status: Option<String>,
    /// Inclusive cap as a fraction (0.05 = 5%).
    pub max_failure_rate: Option<f64>,
}

impl TowerFilter {
    /// Region and status compare case-insensitively. With a failure-rate
    /// cap set, rows without a failure rate do not match.
    pub fn matches(&self, row: &MetricRow) -> bool {
        fn same(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match (wanted, actual) {
                (None, _) => true,
                (Some(w), Some(a)) => w.eq_ignore_ascii_case(a),
                (Some(_), None) => false,
            }
        }

        let rate_ok = match self.max_failure_rate {
            None => true,
            Some(cap) => row.get(Field::FailureRate).is_some_and(|r| r <= cap),
        };
        rate_ok && same(&self.region, &row.region) && same(&self.status, &row.status)
    }

    pub fn apply(&self, towers: &Dataset) -> Dataset {
        towers.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

pub fn find_tower<'a>(towers: &'a Dataset, id: &str) -> Option<&'a MetricRow> {
    towers.iter().find(|r| r.id == id)
}

/// One tower with its derived lookup fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerDetail {
    #[serde(flatten)]
    pub tower: MetricRow,
    /// Severity from the failure rate alone.
    pub severity: Severity,
    pub status_color: &'static str,
    pub days_since_maintenance: Option<i64>,
    pub maintenance_due: bool,
}

impl TowerDetail {
    pub fn new(tower: &MetricRow, today: NaiveDate) -> Self {
        let days_since_maintenance = tower.last_maintenance.map(|d| (today - d).num_days());
        Self {
            severity: classify(tower.get(Field::FailureRate).unwrap_or(0.0), 0),
            status_color: status_color(tower.status.as_deref().unwrap_or(UNKNOWN_STATUS)),
            days_since_maintenance,
            maintenance_due: days_since_maintenance.is_some_and(|d| d > MAINTENANCE_DUE_DAYS),
            tower: tower.clone(),
        }
    }
}

/// Headline figures for a (possibly filtered) tower listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TowerStats {
    pub total: usize,
    pub avg_failure_rate: Option<f64>,
    /// Towers whose reported status is `Critical`.
    pub critical_count: usize,
    pub avg_signal_strength: Option<f64>,
}

impl TowerStats {
    pub fn from_dataset(towers: &Dataset) -> Self {
        Self {
            total: towers.len(),
            avg_failure_rate: mean(&towers.values(Field::FailureRate)),
            critical_count: towers
                .iter()
                .filter(|r| r.status.as_deref() == Some(CRITICAL_STATUS))
                .count(),
            avg_signal_strength: mean(&towers.values(Field::SignalStrength)),
        }
    }
}

/// Tower count per reported status; rows without one count as `Unknown`.
pub fn status_distribution(towers: &Dataset) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in towers {
        let status = row.status.as_deref().unwrap_or(UNKNOWN_STATUS);
        *counts.entry(status.to_string()).or_insert(0) += 1;
    }
    counts
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fleet() -> Dataset {
        Dataset::new(vec![
            MetricRow::new("CT-0001")
                .in_region("North")
                .with_status("Operational")
                .with(Field::FailureRate, 0.01)
                .with(Field::SignalStrength, -80.0),
            MetricRow::new("CT-0002")
                .in_region("North")
                .with_status("Critical")
                .with(Field::FailureRate, 0.12)
                .with(Field::SignalStrength, -95.0),
            MetricRow::new("CT-0003")
                .in_region("South")
                .with_status("Warning")
                .with(Field::FailureRate, 0.05),
            MetricRow::new("CT-0004").in_region("South"),
        ])
    }

    fn ids(ds: &Dataset) -> Vec<&str> {
        ds.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let ds = fleet();
        assert_eq!(TowerFilter::default().apply(&ds), ds);
    }

    #[test]
    fn test_filter_by_region_and_status() {
        let filter = TowerFilter {
            region: Some("north".to_string()),
            status: Some("Critical".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&fleet())), vec!["CT-0002"]);
    }

    #[test]
    fn test_failure_rate_cap_is_inclusive() {
        let filter = TowerFilter {
            max_failure_rate: Some(0.05),
            ..Default::default()
        };
        // CT-0004 has no failure rate and drops out once a cap is set
        assert_eq!(ids(&filter.apply(&fleet())), vec!["CT-0001", "CT-0003"]);
    }

    #[test]
    fn test_find_tower() {
        let ds = fleet();
        assert_eq!(find_tower(&ds, "CT-0003").unwrap().region.as_deref(), Some("South"));
        assert!(find_tower(&ds, "CT-9999").is_none());
    }

    #[test]
    fn test_maintenance_due_after_sixty_days() {
        let today = day(2024, 9, 30);
        let row = MetricRow::new("CT-0001").with(Field::FailureRate, 0.12);

        let fresh = TowerDetail::new(&row.clone().maintained_on(today - Duration::days(60)), today);
        assert_eq!(fresh.days_since_maintenance, Some(60));
        assert!(!fresh.maintenance_due);

        let stale = TowerDetail::new(&row.clone().maintained_on(today - Duration::days(61)), today);
        assert!(stale.maintenance_due);
        assert_eq!(stale.severity, Severity::High);

        let never = TowerDetail::new(&row, today);
        assert_eq!(never.days_since_maintenance, None);
        assert!(!never.maintenance_due);
        assert_eq!(never.status_color, "#6B7280");
    }

    #[test]
    fn test_detail_serializes_flat() {
        let row = MetricRow::new("CT-0007").with_status("Warning");
        let json = serde_json::to_value(TowerDetail::new(&row, day(2024, 1, 1))).unwrap();
        assert_eq!(json["id"], "CT-0007");
        assert_eq!(json["status_color"], "#F59E0B");
        assert_eq!(json["severity"], "Low");
    }

    #[test]
    fn test_stats() {
        let stats = TowerStats::from_dataset(&fleet());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.critical_count, 1);
        assert!((stats.avg_failure_rate.unwrap() - 0.06).abs() < 1e-12);
        assert_eq!(stats.avg_signal_strength, Some(-87.5));
        assert_eq!(TowerStats::from_dataset(&Dataset::default()).avg_signal_strength, None);
    }

    #[test]
    fn test_status_distribution() {
        let counts = status_distribution(&fleet());
        assert_eq!(counts.get("Critical"), Some(&1));
        assert_eq!(counts.get("Unknown"), Some(&1));
        assert_eq!(counts.values().sum::<usize>(), 4);
    }
}
