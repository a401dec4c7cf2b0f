//! Data-access collaborators.
//!
//! Loading is two-stage: ask the primary [`DataSource`]; if it reports
//! [`DataUnavailable`] or comes back empty, serve synthetic sample data
//! instead. [`CachedSource`] adds time-bounded memoization on top. The
//! analytics helpers never see any of this; they only receive a [`Dataset`].

use crate::dataset::{sample, Dataset};
use anyhow::Result;
use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which table-shaped result a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// One row per tower with its recent ticket rollup.
    Towers,
    /// One row per day of ticket activity, chronological.
    TicketSeries,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::Towers => write!(f, "towers"),
            DatasetKind::TicketSeries => write!(f, "ticket_series"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataUnavailable {
    #[error("warehouse not configured: {0}")]
    NotConfigured(String),
    #[error("warehouse connection failed: {0}")]
    Connection(String),
    #[error("warehouse query failed: {0}")]
    Query(String),
}

/// A primary source of records, typically the warehouse.
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, kind: DatasetKind) -> Result<Dataset, DataUnavailable>;
}

/// A source that is never available; used in sample-only mode or when
/// the warehouse cannot be opened.
pub struct Offline;

impl DataSource for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn fetch(&self, _kind: DatasetKind) -> Result<Dataset, DataUnavailable> {
        Err(DataUnavailable::NotConfigured("no warehouse in use".to_string()))
    }
}

/// Synthetic stand-in for `kind`, deterministic apart from the series end date.
pub fn sample_dataset(kind: DatasetKind) -> Result<Dataset> {
    match kind {
        DatasetKind::Towers => {
            sample::towers(sample::SAMPLE_TOWERS, Utc::now().date_naive(), sample::SAMPLE_SEED)
        }
        DatasetKind::TicketSeries => {
            let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
            sample::ticket_series(sample::SAMPLE_DAYS, today, sample::SAMPLE_SEED)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Warehouse,
    Sample,
}

/// A dataset together with where it came from.
#[derive(Debug, Clone)]
pub struct Sourced {
    pub dataset: Arc<Dataset>,
    pub origin: Origin,
}

pub struct FallbackSource {
    primary: Box<dyn DataSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn DataSource>) -> Self {
        Self { primary }
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    /// Fetch from the primary, falling back to sample data.
    ///
    /// Only a failure to build the sample itself is an error.
    pub fn load(&self, kind: DatasetKind) -> Result<Sourced> {
        let source = self.primary.name();
        match self.primary.fetch(kind) {
            Ok(dataset) if !dataset.is_empty() => {
                info!(%source, %kind, rows = dataset.len(), "loaded dataset");
                return Ok(Sourced {
                    dataset: Arc::new(dataset),
                    origin: Origin::Warehouse,
                });
            }
            Ok(_) => warn!(%source, %kind, "source returned no rows, using sample data"),
            Err(e) => warn!(%source, %kind, error = %e, "source unavailable, using sample data"),
        }

        Ok(Sourced {
            dataset: Arc::new(sample_dataset(kind)?),
            origin: Origin::Sample,
        })
    }
}

/// TTL memoization over a [`FallbackSource`], keyed by dataset kind.
pub struct CachedSource {
    inner: FallbackSource,
    ttl: Duration,
    entries: Mutex<HashMap<DatasetKind, (Instant, Sourced)>>,
}

impl CachedSource {
    /// A zero `ttl` disables caching.
    pub fn new(inner: FallbackSource, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn primary_name(&self) -> &str {
        self.inner.primary_name()
    }

    pub fn load(&self, kind: DatasetKind) -> Result<Sourced> {
        if self.ttl.is_zero() {
            return self.inner.load(kind);
        }

        if let Some((at, cached)) = self.lock().get(&kind) {
            if at.elapsed() < self.ttl {
                debug!(%kind, "serving cached dataset");
                return Ok(cached.clone());
            }
        }

        // Fetch outside the lock; a concurrent miss just fetches twice.
        let fresh = self.inner.load(kind)?;
        self.lock().insert(kind, (Instant::now(), fresh.clone()));
        Ok(fresh)
    }

    pub fn invalidate(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DatasetKind, (Instant, Sourced)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Field, MetricRow};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        rows: usize,
        calls: Arc<AtomicUsize>,
    }

    impl DataSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, _kind: DatasetKind) -> Result<Dataset, DataUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.rows)
                .map(|i| MetricRow::new(format!("T{}", i)).with(Field::FailureRate, 0.01))
                .collect())
        }
    }

    #[test]
    fn test_primary_data_is_used() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FallbackSource::new(Box::new(Fixed { rows: 3, calls }));
        let loaded = source.load(DatasetKind::Towers).unwrap();
        assert_eq!(loaded.origin, Origin::Warehouse);
        assert_eq!(loaded.dataset.len(), 3);
    }

    #[test]
    fn test_unavailable_falls_back_to_sample() {
        let source = FallbackSource::new(Box::new(Offline));
        let loaded = source.load(DatasetKind::Towers).unwrap();
        assert_eq!(loaded.origin, Origin::Sample);
        assert_eq!(loaded.dataset.len(), sample::SAMPLE_TOWERS);

        let series = source.load(DatasetKind::TicketSeries).unwrap();
        assert_eq!(series.dataset.len(), sample::SAMPLE_DAYS);
    }

    #[test]
    fn test_empty_result_falls_back_to_sample() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FallbackSource::new(Box::new(Fixed { rows: 0, calls }));
        assert_eq!(source.load(DatasetKind::Towers).unwrap().origin, Origin::Sample);
    }

    #[test]
    fn test_cache_hits_within_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let primary = Fixed {
            rows: 2,
            calls: calls.clone(),
        };
        let cached = CachedSource::new(
            FallbackSource::new(Box::new(primary)),
            Duration::from_secs(300),
        );
        cached.load(DatasetKind::Towers).unwrap();
        cached.load(DatasetKind::Towers).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cached.load(DatasetKind::TicketSeries).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cached.invalidate();
        cached.load(DatasetKind::Towers).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let primary = Fixed {
            rows: 1,
            calls: calls.clone(),
        };
        let cached = CachedSource::new(FallbackSource::new(Box::new(primary)), Duration::ZERO);
        cached.load(DatasetKind::Towers).unwrap();
        cached.load(DatasetKind::Towers).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
