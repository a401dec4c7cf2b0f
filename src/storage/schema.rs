//! Database schema and migrations for the local warehouse mirror.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS cell_towers (
            cell_tower_id TEXT PRIMARY KEY,
            latitude REAL,
            longitude REAL,
            failure_rate REAL,
            signal_strength REAL,
            region TEXT,
            status TEXT
        );

        CREATE TABLE IF NOT EXISTS support_tickets (
            ticket_id INTEGER PRIMARY KEY,
            cell_tower_id TEXT NOT NULL,
            ticket_date TEXT NOT NULL,
            sentiment_score REAL,
            status TEXT NOT NULL DEFAULT 'OPEN',
            FOREIGN KEY (cell_tower_id) REFERENCES cell_towers(cell_tower_id)
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_date ON support_tickets(ticket_date);
        CREATE INDEX IF NOT EXISTS idx_tickets_tower ON support_tickets(cell_tower_id);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;

    // v2: coverage radius and last maintenance date on towers
    for (column, ty) in [("coverage_radius", "REAL"), ("last_maintenance_date", "TEXT")] {
        let present: i64 = conn.query_row(
            "SELECT count(*) FROM pragma_table_info('cell_towers') WHERE name = ?1",
            [column],
            |row| row.get(0),
        )?;
        if present == 0 {
            conn.execute_batch(&format!("ALTER TABLE cell_towers ADD COLUMN {} {};", column, ty))?;
        }
    }
    conn.execute("INSERT OR IGNORE INTO schema_version (version) VALUES (2)", [])?;

    Ok(())
}
