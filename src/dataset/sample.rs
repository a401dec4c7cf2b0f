//! Deterministic synthetic data served when the warehouse is unreachable.

use crate::dataset::{Dataset, Field, MetricRow};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Beta, Exp, Normal, Poisson, Uniform};

pub const SAMPLE_SEED: u64 = 42;
pub const SAMPLE_TOWERS: usize = 200;
pub const SAMPLE_DAYS: usize = 90;

/// Towers are scattered around downtown San Francisco.
const CENTER: (f64, f64) = (37.7749, -122.4194);
const SPREAD_DEG: f64 = 0.15;

const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
const STATUSES: [&str; 3] = ["Operational", "Warning", "Critical"];
const STATUS_WEIGHTS: [u32; 3] = [70, 20, 10];

/// Mean ticket load of a tower that never fails.
const BASE_TICKETS: f64 = 15.0;
const MEAN_DAYS_SINCE_SERVICE: f64 = 30.0;

fn invalid(what: &str, e: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("invalid {} distribution: {}", what, e)
}

/// Tower rows with a built-in positive link between failure rate and tickets.
/// Maintenance dates fall before `as_of`, about a month back on average.
pub fn towers(count: usize, as_of: NaiveDate, seed: u64) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);

    let lat = Normal::new(CENTER.0, SPREAD_DEG).map_err(|e| invalid("latitude", e))?;
    let lon = Normal::new(CENTER.1, SPREAD_DEG).map_err(|e| invalid("longitude", e))?;
    let failure = Beta::new(2.0, 50.0).map_err(|e| invalid("failure rate", e))?;
    let sentiment = Beta::new(2.0, 2.0).map_err(|e| invalid("sentiment", e))?;
    let signal = Normal::new(-85.0, 8.0).map_err(|e| invalid("signal", e))?;
    let status = WeightedIndex::new(STATUS_WEIGHTS).map_err(|e| invalid("status", e))?;
    let tickets = Poisson::new(BASE_TICKETS).map_err(|e| invalid("tickets", e))?;
    let coverage = Uniform::new(0.5, 3.0).map_err(|e| invalid("coverage", e))?;
    let since_service =
        Exp::new(1.0 / MEAN_DAYS_SINCE_SERVICE).map_err(|e| invalid("maintenance", e))?;

    let rows = (1..=count)
        .map(|i| {
            let rate: f64 = failure.sample(&mut rng);
            let base_tickets: f64 = tickets.sample(&mut rng);
            let days_back: f64 = since_service.sample(&mut rng);
            MetricRow::new(format!("CT-{:04}", i))
                .located(lat.sample(&mut rng), lon.sample(&mut rng))
                .in_region(REGIONS[rng.gen_range(0..REGIONS.len())])
                .with(Field::FailureRate, rate)
                .with(Field::TicketCount, (base_tickets + rate * 100.0).trunc())
                .with(Field::Sentiment, sentiment.sample(&mut rng) * 3.0 + 1.0)
                .with(Field::SignalStrength, signal.sample(&mut rng))
                .with(Field::CoverageRadius, coverage.sample(&mut rng))
                .with_status(STATUSES[status.sample(&mut rng)])
                .maintained_on(as_of - Duration::days(days_back.trunc() as i64))
        })
        .collect();

    Ok(Dataset::new(rows))
}

/// Daily ticket totals ending at `end`: a rising trend, two seasonal cycles
/// and Gaussian noise.
pub fn ticket_series(days: usize, end: DateTime<Utc>, seed: u64) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 5.0).map_err(|e| invalid("noise", e))?;
    let sentiment = Beta::new(2.0, 2.0).map_err(|e| invalid("sentiment", e))?;

    let span = days.saturating_sub(1).max(1) as f64;
    let rows = (0..days)
        .map(|i| {
            let t = i as f64 / span;
            let trend = 50.0 + 30.0 * t;
            let seasonal = 10.0 * (4.0 * std::f64::consts::PI * t).sin();
            let count = (trend + seasonal + noise.sample(&mut rng)).max(0.0).trunc();
            let open_share: f64 = rng.gen_range(0.3..0.7);
            let day = end - Duration::days((days - 1 - i) as i64);

            MetricRow::new(day.format("%Y-%m-%d").to_string())
                .at(day)
                .with(Field::TicketCount, count)
                .with(Field::OpenTickets, (count * open_share).trunc())
                .with(Field::Sentiment, sentiment.sample(&mut rng) * 3.0 + 1.0)
        })
        .collect();

    Ok(Dataset::new(rows))
}
