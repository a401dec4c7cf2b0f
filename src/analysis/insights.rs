//! Network-wide headline figures and the rule-based recommendations built on them.

use crate::dataset::{Dataset, Field, MetricRow};
use crate::detect::{classify, Severity};
use serde::Serialize;

/// Towers failing more often than this count as high risk.
pub const HIGH_RISK_FAILURE_RATE: f64 = 0.05;

/// Sentiment scores run 1-4; below this customers are unhappy.
pub const SENTIMENT_CONCERN: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub total_towers: usize,
    pub avg_failure_rate: f64,
    pub high_risk_towers: usize,
    pub total_tickets: f64,
    pub avg_sentiment: f64,
}

impl NetworkSummary {
    pub fn from_dataset(towers: &Dataset) -> Self {
        let rates = towers.values(Field::FailureRate);
        let sentiment = towers.values(Field::Sentiment);
        Self {
            total_towers: towers.len(),
            avg_failure_rate: mean(&rates),
            high_risk_towers: rates.iter().filter(|r| **r > HIGH_RISK_FAILURE_RATE).count(),
            total_tickets: towers.values(Field::TicketCount).iter().sum(),
            avg_sentiment: mean(&sentiment),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    FailureRateAlert,
    NetworkHealthy,
    SatisfactionConcern,
    PositiveSentiment,
    MaintenancePriority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
        }
    }
}

pub fn rule_based_insights(summary: &NetworkSummary) -> Vec<Insight> {
    let mut insights = Vec::with_capacity(3);

    if summary.avg_failure_rate > HIGH_RISK_FAILURE_RATE {
        insights.push(Insight::new(
            InsightKind::FailureRateAlert,
            "High Failure Rate Alert",
            format!(
                "Average failure rate is {:.2}%, above the {:.0}% threshold. Immediate maintenance review recommended for high-risk towers.",
                summary.avg_failure_rate * 100.0,
                HIGH_RISK_FAILURE_RATE * 100.0
            ),
        ));
    } else {
        insights.push(Insight::new(
            InsightKind::NetworkHealthy,
            "Network Health Good",
            "Failure rates are within acceptable ranges. Continue regular monitoring.".to_string(),
        ));
    }

    if summary.avg_sentiment < SENTIMENT_CONCERN {
        insights.push(Insight::new(
            InsightKind::SatisfactionConcern,
            "Customer Satisfaction Concern",
            format!(
                "Average sentiment is {:.2}, below {:.1}. Consider proactive customer outreach and service improvements.",
                summary.avg_sentiment, SENTIMENT_CONCERN
            ),
        ));
    } else {
        insights.push(Insight::new(
            InsightKind::PositiveSentiment,
            "Positive Customer Sentiment",
            "Customers are generally satisfied. Maintain current service quality standards.".to_string(),
        ));
    }

    if summary.high_risk_towers > 0 {
        insights.push(Insight::new(
            InsightKind::MaintenancePriority,
            "Maintenance Priority",
            format!(
                "{} towers require immediate attention. Schedule maintenance to prevent service degradation.",
                summary.high_risk_towers
            ),
        ));
    }

    insights
}

/// A tower ranked for maintenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityTower {
    pub id: String,
    pub region: Option<String>,
    pub priority_score: f64,
    pub severity: Severity,
    pub failure_rate: f64,
    pub ticket_count: f64,
    pub sentiment: Option<f64>,
}

/// Failure rate and ticket load as in [`crate::detect::severity_score`],
/// plus how far sentiment sits below the top of the scale.
pub fn priority_score(row: &MetricRow) -> Option<f64> {
    let rate = row.get(Field::FailureRate)?;
    let tickets = row.get(Field::TicketCount)?;
    let sentiment_gap = row.get(Field::Sentiment).map_or(0.0, |s| 5.0 - s);
    Some(rate * 100.0 + tickets / 10.0 + sentiment_gap)
}

/// The `n` worst towers by [`priority_score`], worst first.
pub fn priority_towers(towers: &Dataset, n: usize) -> Vec<PriorityTower> {
    let mut ranked: Vec<PriorityTower> = towers
        .iter()
        .filter_map(|row| {
            let score = priority_score(row)?;
            let rate = row.get(Field::FailureRate)?;
            let tickets = row.get(Field::TicketCount)?;
            Some(PriorityTower {
                id: row.id.clone(),
                region: row.region.clone(),
                priority_score: score,
                severity: classify(rate, tickets.round() as i64),
                failure_rate: rate,
                ticket_count: tickets,
                sentiment: row.get(Field::Sentiment),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(n);
    ranked
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
