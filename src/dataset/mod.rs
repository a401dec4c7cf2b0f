//! Tabular input model shared by every analytics helper.
//!
//! Rows are produced by a [`source::DataSource`] and never mutated by the
//! analytics code; helpers read columns and return new derived values.

pub mod sample;
pub mod source;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Numeric columns addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FailureRate,
    SignalStrength,
    TicketCount,
    OpenTickets,
    Sentiment,
    Latitude,
    Longitude,
    CoverageRadius,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FailureRate => "failure_rate",
            Field::SignalStrength => "signal_strength",
            Field::TicketCount => "ticket_count",
            Field::OpenTickets => "open_tickets",
            Field::Sentiment => "sentiment",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::CoverageRadius => "coverage_radius",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "failure_rate" => Ok(Field::FailureRate),
            "signal_strength" => Ok(Field::SignalStrength),
            "ticket_count" => Ok(Field::TicketCount),
            "open_tickets" => Ok(Field::OpenTickets),
            "sentiment" | "avg_sentiment" => Ok(Field::Sentiment),
            "latitude" | "lat" => Ok(Field::Latitude),
            "longitude" | "lon" => Ok(Field::Longitude),
            "coverage_radius" | "coverage" => Ok(Field::CoverageRadius),
            other => Err(format!("unknown field: {}", other)),
        }
    }
}

/// One observation: a cell tower (optionally with its ticket rollup) or one
/// day of a ticket series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub failure_rate: Option<f64>,
    pub signal_strength: Option<f64>,
    pub ticket_count: Option<f64>,
    pub open_tickets: Option<f64>,
    pub sentiment: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Coverage radius in km.
    pub coverage_radius: Option<f64>,
    pub last_maintenance: Option<NaiveDate>,
}

impl MetricRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Read a numeric column. NaN is treated as missing.
    pub fn get(&self, field: Field) -> Option<f64> {
        let value = match field {
            Field::FailureRate => self.failure_rate,
            Field::SignalStrength => self.signal_strength,
            Field::TicketCount => self.ticket_count,
            Field::OpenTickets => self.open_tickets,
            Field::Sentiment => self.sentiment,
            Field::Latitude => self.latitude,
            Field::Longitude => self.longitude,
            Field::CoverageRadius => self.coverage_radius,
        };
        value.filter(|v| !v.is_nan())
    }

    pub fn with(mut self, field: Field, value: f64) -> Self {
        let slot = match field {
            Field::FailureRate => &mut self.failure_rate,
            Field::SignalStrength => &mut self.signal_strength,
            Field::TicketCount => &mut self.ticket_count,
            Field::OpenTickets => &mut self.open_tickets,
            Field::Sentiment => &mut self.sentiment,
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::CoverageRadius => &mut self.coverage_radius,
        };
        *slot = Some(value);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn maintained_on(mut self, day: NaiveDate) -> Self {
        self.last_maintenance = Some(day);
        self
    }

    pub fn located(self, latitude: f64, longitude: f64) -> Self {
        self.with(Field::Latitude, latitude)
            .with(Field::Longitude, longitude)
    }
}

/// A chronological (timestamp, value) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Ordered rows sharing one schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<MetricRow>,
}

impl Dataset {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricRow> {
        self.rows.iter()
    }

    /// Full column, `None` where a row lacks the field.
    pub fn column(&self, field: Field) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(field)).collect()
    }

    /// Present values of a column, in row order.
    pub fn values(&self, field: Field) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(field)).collect()
    }

    /// Rows that carry both a timestamp and `field`, as a time series.
    pub fn series(&self, field: Field) -> Vec<TimePoint> {
        self.rows
            .iter()
            .filter_map(|r| {
                Some(TimePoint {
                    timestamp: r.timestamp?,
                    value: r.get(field)?,
                })
            })
            .collect()
    }
}

impl FromIterator<MetricRow> for Dataset {
    fn from_iter<I: IntoIterator<Item = MetricRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a MetricRow;
    type IntoIter = std::slice::Iter<'a, MetricRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
