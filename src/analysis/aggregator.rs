use crate::analysis::hexgrid::HexCell;
use crate::dataset::{Dataset, Field};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-cell rollup of tower rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub cell: HexCell,
    /// `None` when no row in the cell reports a failure rate.
    pub avg_failure_rate: Option<f64>,
    pub tower_count: usize,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Default)]
struct CellAccumulator {
    count: usize,
    lat_sum: f64,
    lon_sum: f64,
    rate_sum: f64,
    rate_count: usize,
}

/// Group rows into hexagonal cells and reduce each cell.
///
/// Rows missing either coordinate, or with coordinates H3 cannot index, are
/// skipped. An empty dataset yields an empty map.
pub fn aggregate(
    dataset: &Dataset,
    lat_field: Field,
    lon_field: Field,
    resolution: u8,
) -> BTreeMap<HexCell, RegionStats> {
    let mut cells: BTreeMap<HexCell, CellAccumulator> = BTreeMap::new();

    for row in dataset {
        let (Some(lat), Some(lon)) = (row.get(lat_field), row.get(lon_field)) else {
            continue;
        };
        let Some(cell) = HexCell::from_coords(lat, lon, resolution) else {
            continue;
        };
        let acc = cells.entry(cell).or_default();
        acc.count += 1;
        acc.lat_sum += lat;
        acc.lon_sum += lon;
        if let Some(rate) = row.get(Field::FailureRate) {
            acc.rate_sum += rate;
            acc.rate_count += 1;
        }
    }

    cells
        .into_iter()
        .map(|(cell, acc)| {
            let n = acc.count as f64;
            let stats = RegionStats {
                cell,
                avg_failure_rate: (acc.rate_count > 0).then(|| acc.rate_sum / acc.rate_count as f64),
                tower_count: acc.count,
                latitude: acc.lat_sum / n,
                longitude: acc.lon_sum / n,
            };
            (cell, stats)
        })
        .collect()
}

/// Rollup of towers sharing a named region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub tower_count: usize,
    pub total_tickets: f64,
    pub avg_tickets: f64,
    pub avg_failure_rate: Option<f64>,
    /// Sample standard deviation; `None` below two observations.
    pub std_failure_rate: Option<f64>,
    pub avg_sentiment: Option<f64>,
}

/// Group towers by region name, busiest (most tickets) first.
///
/// Rows without a region are collected under `"Unknown"`.
pub fn regional_breakdown(dataset: &Dataset) -> Vec<RegionSummary> {
    let mut groups: HashMap<&str, Vec<&crate::dataset::MetricRow>> = HashMap::new();
    for row in dataset {
        let region = row.region.as_deref().unwrap_or("Unknown");
        groups.entry(region).or_default().push(row);
    }

    let mut summaries: Vec<RegionSummary> = groups
        .into_iter()
        .map(|(region, rows)| {
            let tickets: Vec<f64> = rows.iter().filter_map(|r| r.get(Field::TicketCount)).collect();
            let rates: Vec<f64> = rows.iter().filter_map(|r| r.get(Field::FailureRate)).collect();
            let sentiment: Vec<f64> = rows.iter().filter_map(|r| r.get(Field::Sentiment)).collect();
            let total_tickets: f64 = tickets.iter().sum();

            RegionSummary {
                region: region.to_string(),
                tower_count: rows.len(),
                total_tickets,
                avg_tickets: mean(&tickets).unwrap_or(0.0),
                avg_failure_rate: mean(&rates),
                std_failure_rate: sample_std(&rates),
                avg_sentiment: mean(&sentiment),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_tickets
            .total_cmp(&a.total_tickets)
            .then_with(|| a.region.cmp(&b.region))
    });
    summaries
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MetricRow;

    #[test]
    fn test_empty_dataset() {
        let out = aggregate(&Dataset::default(), Field::Latitude, Field::Longitude, 7);
        assert!(out.is_empty());
        assert!(regional_breakdown(&Dataset::default()).is_empty());
    }

    #[test]
    fn test_shared_coordinate_single_bucket() {
        let ds: Dataset = (0..12)
            .map(|i| {
                MetricRow::new(format!("CT-{:04}", i))
                    .located(37.7749, -122.4194)
                    .with(Field::FailureRate, 0.01 * (i % 3) as f64)
            })
            .collect();
        let out = aggregate(&ds, Field::Latitude, Field::Longitude, 7);
        assert_eq!(out.len(), 1);
        let stats = out.values().next().unwrap();
        assert_eq!(stats.tower_count, 12);
        assert!((stats.latitude - 37.7749).abs() < 1e-9);
        assert!((stats.longitude + 122.4194).abs() < 1e-9);
        assert!((stats.avg_failure_rate.unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_rows_without_coordinates_excluded() {
        let ds = Dataset::new(vec![
            MetricRow::new("a").located(1.0, 1.0),
            MetricRow::new("b").with(Field::Latitude, 1.0),
            MetricRow::new("c"),
        ]);
        let out = aggregate(&ds, Field::Latitude, Field::Longitude, 5);
        assert_eq!(out.values().map(|s| s.tower_count).sum::<usize>(), 1);
        assert_eq!(out.values().next().unwrap().avg_failure_rate, None);
    }

    #[test]
    fn test_distant_points_split() {
        let ds = Dataset::new(vec![
            MetricRow::new("sf").located(37.77, -122.42),
            MetricRow::new("ny").located(40.71, -74.00),
        ]);
        assert_eq!(aggregate(&ds, Field::Latitude, Field::Longitude, 7).len(), 2);
    }

    #[test]
    fn test_towers_across_antimeridian_stay_together() {
        // Two Fiji towers about 22 m apart either side of 180°
        let ds = Dataset::new(vec![
            MetricRow::new("taveuni-e").located(-16.8, 179.9999),
            MetricRow::new("taveuni-w").located(-16.8, -179.9999),
        ]);
        let out = aggregate(&ds, Field::Latitude, Field::Longitude, 7);
        let cells: Vec<HexCell> = out.keys().copied().collect();
        match cells.as_slice() {
            [_] => {}
            [a, b] => assert!(a.neighbors().contains(b)),
            other => panic!("unexpected cells: {:?}", other),
        }
    }

    #[test]
    fn test_regional_breakdown_orders_by_tickets() {
        let ds = Dataset::new(vec![
            MetricRow::new("1").in_region("North").with(Field::TicketCount, 5.0).with(Field::FailureRate, 0.02),
            MetricRow::new("2").in_region("North").with(Field::TicketCount, 7.0).with(Field::FailureRate, 0.04),
            MetricRow::new("3").in_region("South").with(Field::TicketCount, 30.0),
            MetricRow::new("4").with(Field::TicketCount, 1.0),
        ]);
        let out = regional_breakdown(&ds);
        let names: Vec<&str> = out.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["South", "North", "Unknown"]);

        let north = &out[1];
        assert_eq!(north.tower_count, 2);
        assert_eq!(north.total_tickets, 12.0);
        assert_eq!(north.avg_tickets, 6.0);
        assert!((north.avg_failure_rate.unwrap() - 0.03).abs() < 1e-12);
        assert!(north.std_failure_rate.unwrap() > 0.0);
        assert_eq!(out[0].std_failure_rate, None);
    }
}
