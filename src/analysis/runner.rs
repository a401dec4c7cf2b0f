use crate::analysis::aggregator::{aggregate, regional_breakdown, RegionStats, RegionSummary};
use crate::analysis::correlation::{correlate, CorrelationResult};
use crate::analysis::insights::{
    priority_towers, rule_based_insights, Insight, NetworkSummary, PriorityTower,
};
use crate::analysis::towers::{status_distribution, TowerStats};
use crate::analysis::trend::{forecast, moving_average, ForecastPoint, ForecastSummary};
use crate::analysis::AnalysisError;
use crate::config::AnalyticsConfig;
use crate::dataset::{Dataset, Field, TimePoint};
use crate::detect::{classify_dataset, detect, z_scores, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the dashboard shows, computed in one pass over two datasets.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub generated_at: DateTime<Utc>,
    pub summary: NetworkSummary,
    pub insights: Vec<Insight>,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub tower_stats: TowerStats,
    pub status_distribution: BTreeMap<String, usize>,
    pub correlations: Vec<FieldCorrelation>,
    pub anomalies: Vec<AnomalyPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub forecast_summary: ForecastSummary,
    pub moving_average: Vec<TimePoint>,
    pub regions: Vec<RegionStats>,
    pub regional_breakdown: Vec<RegionSummary>,
    pub priority_towers: Vec<PriorityTower>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldCorrelation {
    pub a: Field,
    pub b: Field,
    #[serde(flatten)]
    pub result: CorrelationResult,
}

/// A flagged day in the ticket series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub z_score: f64,
}

/// Pairs reported alongside the dashboard's failure/ticket scatter.
pub const REPORT_CORRELATIONS: [(Field, Field); 3] = [
    (Field::FailureRate, Field::TicketCount),
    (Field::FailureRate, Field::Sentiment),
    (Field::TicketCount, Field::Sentiment),
];

/// Ticket-count anomalies with their z-scores, oldest first.
pub fn ticket_anomalies(series: &[TimePoint], threshold: f64) -> Vec<AnomalyPoint> {
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    let flags = detect(&values, threshold);
    let scores = z_scores(&values);

    series
        .iter()
        .zip(flags)
        .zip(scores)
        .filter(|((_, flagged), _)| *flagged)
        .map(|((point, _), z)| AnomalyPoint {
            timestamp: point.timestamp,
            value: point.value,
            z_score: z,
        })
        .collect()
}

pub fn severity_distribution(towers: &Dataset) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for severity in classify_dataset(towers).into_iter().flatten() {
        *counts.entry(severity).or_insert(0) += 1;
    }
    counts
}

/// Build the full report.
///
/// Fails only when the ticket series is too short to forecast.
pub fn build_report(
    towers: &Dataset,
    series: &Dataset,
    cfg: &AnalyticsConfig,
) -> Result<NetworkReport, AnalysisError> {
    let tickets = series.series(Field::TicketCount);

    let predicted = forecast(&tickets, cfg.forecast_window, cfg.forecast_horizon)?;
    let forecast_summary = ForecastSummary::from_forecast(&tickets, &predicted, cfg.recent_days);

    let values: Vec<f64> = tickets.iter().map(|p| p.value).collect();
    let smoothed = moving_average(&values, cfg.moving_average_window)
        .into_iter()
        .zip(&tickets)
        .map(|(value, p)| TimePoint {
            timestamp: p.timestamp,
            value,
        })
        .collect();

    let correlations = REPORT_CORRELATIONS
        .iter()
        .map(|&(a, b)| FieldCorrelation {
            a,
            b,
            result: correlate(towers, a, b),
        })
        .collect();

    let summary = NetworkSummary::from_dataset(towers);
    let insights = rule_based_insights(&summary);

    Ok(NetworkReport {
        generated_at: Utc::now(),
        summary,
        insights,
        severity_distribution: severity_distribution(towers),
        tower_stats: TowerStats::from_dataset(towers),
        status_distribution: status_distribution(towers),
        correlations,
        anomalies: ticket_anomalies(&tickets, cfg.anomaly_threshold),
        forecast: predicted,
        forecast_summary,
        moving_average: smoothed,
        regions: aggregate(towers, Field::Latitude, Field::Longitude, cfg.hex_resolution)
            .into_values()
            .collect(),
        regional_breakdown: regional_breakdown(towers),
        priority_towers: priority_towers(towers, cfg.top_n),
    })
}
