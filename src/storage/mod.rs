//! SQLite mirror of the warehouse tables -- pool, schema, queries.

pub mod schema;

use crate::dataset::source::{DataSource, DataUnavailable, DatasetKind};
use crate::dataset::{sample, Dataset, Field, MetricRow};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &Path) -> Result<Pool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// A row of `cell_towers`.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerRecord {
    pub cell_tower_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub failure_rate: Option<f64>,
    pub signal_strength: Option<f64>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub coverage_radius: Option<f64>,
    pub last_maintenance_date: Option<NaiveDate>,
}

/// A row of `support_tickets`.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    pub cell_tower_id: String,
    pub ticket_date: NaiveDate,
    pub sentiment_score: Option<f64>,
    pub open: bool,
}

pub fn save_tower(conn: &Connection, t: &TowerRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO cell_towers
            (cell_tower_id, latitude, longitude, failure_rate, signal_strength, region, status,
             coverage_radius, last_maintenance_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(cell_tower_id) DO UPDATE SET
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            failure_rate = excluded.failure_rate,
            signal_strength = excluded.signal_strength,
            region = excluded.region,
            status = excluded.status,
            coverage_radius = excluded.coverage_radius,
            last_maintenance_date = excluded.last_maintenance_date",
        params![
            t.cell_tower_id,
            t.latitude,
            t.longitude,
            t.failure_rate,
            t.signal_strength,
            t.region,
            t.status,
            t.coverage_radius,
            t.last_maintenance_date.map(|d| d.format("%Y-%m-%d").to_string())
        ],
    )?;
    Ok(())
}

pub fn save_ticket(conn: &Connection, t: &TicketRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO support_tickets (cell_tower_id, ticket_date, sentiment_score, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            t.cell_tower_id,
            t.ticket_date.format("%Y-%m-%d").to_string(),
            t.sentiment_score,
            if t.open { "OPEN" } else { "CLOSED" }
        ],
    )?;
    Ok(())
}

/// Replace the database contents with the synthetic sample: towers plus
/// individual tickets matching the sample daily series. Returns
/// (towers, tickets) written.
pub fn seed_sample(pool: &Pool) -> Result<(usize, usize)> {
    let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let towers = sample::towers(sample::SAMPLE_TOWERS, today.date_naive(), sample::SAMPLE_SEED)?;
    let series = sample::ticket_series(sample::SAMPLE_DAYS, today, sample::SAMPLE_SEED)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    tx.execute_batch("DELETE FROM support_tickets; DELETE FROM cell_towers;")?;

    for row in &towers {
        save_tower(
            &tx,
            &TowerRecord {
                cell_tower_id: row.id.clone(),
                latitude: row.get(Field::Latitude),
                longitude: row.get(Field::Longitude),
                failure_rate: row.get(Field::FailureRate),
                signal_strength: row.get(Field::SignalStrength),
                region: row.region.clone(),
                status: row.status.clone(),
                coverage_radius: row.get(Field::CoverageRadius),
                last_maintenance_date: row.last_maintenance,
            },
        )?;
    }

    let ids: Vec<&str> = towers.iter().map(|r| r.id.as_str()).collect();
    let mut written = 0usize;
    for (day_index, day) in series.iter().enumerate() {
        let Some(ts) = day.timestamp else { continue };
        let count = day.get(Field::TicketCount).unwrap_or(0.0) as usize;
        let open = day.get(Field::OpenTickets).unwrap_or(0.0) as usize;
        for i in 0..count {
            // spread tickets over towers deterministically
            let tower = ids[(day_index * 31 + i * 7) % ids.len()];
            save_ticket(
                &tx,
                &TicketRecord {
                    cell_tower_id: tower.to_string(),
                    ticket_date: ts.date_naive(),
                    sentiment_score: day.get(Field::Sentiment),
                    open: i < open,
                },
            )?;
            written += 1;
        }
    }

    tx.commit()?;
    info!(towers = towers.len(), tickets = written, "seeded sample data");
    Ok((towers.len(), written))
}

/// Reads datasets from the SQLite warehouse mirror.
pub struct WarehouseSource {
    pool: Pool,
    lookback_days: u32,
}

impl WarehouseSource {
    pub fn new(pool: Pool, lookback_days: u32) -> Self {
        Self {
            pool,
            lookback_days,
        }
    }

    /// Open an existing database. A missing file means no warehouse is configured.
    pub fn open(path: &Path, lookback_days: u32) -> Result<Self, DataUnavailable> {
        if !path.exists() {
            return Err(DataUnavailable::NotConfigured(format!(
                "no database at {}",
                path.display()
            )));
        }
        let pool = open_pool(path).map_err(|e| DataUnavailable::Connection(format!("{:#}", e)))?;
        Ok(Self::new(pool, lookback_days))
    }

    fn window(&self) -> String {
        format!("-{} days", self.lookback_days)
    }

    fn query_towers(&self, conn: &Connection) -> rusqlite::Result<Vec<MetricRow>> {
        let mut stmt = conn.prepare(
            "SELECT ct.cell_tower_id, ct.latitude, ct.longitude, ct.failure_rate,
                    ct.signal_strength, ct.region, ct.status,
                    ct.coverage_radius, ct.last_maintenance_date,
                    COUNT(st.ticket_id), AVG(st.sentiment_score)
             FROM cell_towers ct
             LEFT JOIN support_tickets st
               ON ct.cell_tower_id = st.cell_tower_id
              AND st.ticket_date >= date('now', ?1)
             GROUP BY ct.cell_tower_id
             ORDER BY ct.cell_tower_id",
        )?;

        let rows = stmt.query_map(params![self.window()], |row| {
            let mut r = MetricRow::new(row.get::<_, String>(0)?);
            r.latitude = row.get(1)?;
            r.longitude = row.get(2)?;
            r.failure_rate = row.get(3)?;
            r.signal_strength = row.get(4)?;
            r.region = row.get(5)?;
            r.status = row.get(6)?;
            r.coverage_radius = row.get(7)?;
            r.last_maintenance = row
                .get::<_, Option<String>>(8)?
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
            r.ticket_count = Some(row.get::<_, i64>(9)? as f64);
            r.sentiment = row.get(10)?;
            Ok(r)
        })?;

        rows.collect()
    }

    fn query_series(&self, conn: &Connection) -> rusqlite::Result<Vec<MetricRow>> {
        let mut stmt = conn.prepare(
            "SELECT ticket_date, COUNT(*), AVG(sentiment_score),
                    SUM(CASE WHEN status = 'OPEN' THEN 1 ELSE 0 END)
             FROM support_tickets
             WHERE ticket_date >= date('now', ?1)
             GROUP BY ticket_date
             ORDER BY ticket_date",
        )?;

        let rows = stmt.query_map(params![self.window()], |row| {
            let date: String = row.get(0)?;
            let mut r = MetricRow::new(date.clone());
            r.timestamp = parse_day(&date);
            r.ticket_count = Some(row.get::<_, i64>(1)? as f64);
            r.sentiment = row.get(2)?;
            r.open_tickets = Some(row.get::<_, i64>(3)? as f64);
            Ok(r)
        })?;

        rows.collect()
    }
}

fn parse_day(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

impl DataSource for WarehouseSource {
    fn name(&self) -> &str {
        "warehouse"
    }

    fn fetch(&self, kind: DatasetKind) -> Result<Dataset, DataUnavailable> {
        let conn = self
            .pool
            .get()
            .map_err(|e| DataUnavailable::Connection(e.to_string()))?;
        let rows = match kind {
            DatasetKind::Towers => self.query_towers(&conn),
            DatasetKind::TicketSeries => self.query_series(&conn),
        }
        .map_err(|e| DataUnavailable::Query(e.to_string()))?;
        Ok(Dataset::new(rows))
    }
}
