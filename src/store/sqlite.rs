//! SQLite-backed observation store.
//!
//! Two tables make up all durable state: `h8_data` (unique on
//! `series_name, date`) and `data_updates` (append-only audit log).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, info};

use crate::domain::{AssetClass, BankType, Observation, ObservationQuery, UpdateRecord};
use crate::error::StoreError;
use crate::store::ObservationStore;

const DATE_FMT: &str = "%Y-%m-%d";

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS h8_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    series_name TEXT NOT NULL,
    date TEXT NOT NULL,
    value REAL NOT NULL,
    bank_type TEXT NOT NULL,
    asset_class TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(series_name, date)
);

CREATE INDEX IF NOT EXISTS idx_h8_date ON h8_data(date);
CREATE INDEX IF NOT EXISTS idx_h8_series ON h8_data(series_name);

CREATE TABLE IF NOT EXISTS data_updates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    update_date TEXT NOT NULL,
    records_added INTEGER NOT NULL,
    status TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        info!(db_path = %path.display(), journal_mode = %mode, "Opened observation store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Inserts run in a transaction; a poisoned lock never guards a partial batch.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObservationStore for SqliteStore {
    fn insert(&self, rows: &[Observation]) -> Result<usize, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO h8_data (series_name, date, value, bank_type, asset_class)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.series_name,
                    row.date.format(DATE_FMT).to_string(),
                    row.value,
                    row.bank_type.as_str(),
                    row.asset_class.as_str(),
                ])?;
            }
        }
        tx.commit()?;

        debug!(attempted = rows.len(), inserted, "Inserted observations");
        Ok(inserted)
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError> {
        let mut sql = String::from(
            "SELECT series_name, date, value, bank_type, asset_class FROM h8_data WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(name) = &query.series_name {
            args.push(name.clone());
            sql.push_str(&format!(" AND series_name = ?{}", args.len()));
        }
        if let Some(start) = query.range.start {
            args.push(start.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date >= ?{}", args.len()));
        }
        if let Some(end) = query.range.end {
            args.push(end.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date <= ?{}", args.len()));
        }
        sql.push_str(" ORDER BY date, series_name");

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(series_name, date, value, bank_type, asset_class)| {
                Ok(Observation {
                    series_name,
                    date: parse_date(&date)?,
                    value,
                    bank_type: bank_type.parse::<BankType>().map_err(StoreError::BadLabel)?,
                    asset_class: asset_class.parse::<AssetClass>().map_err(StoreError::BadLabel)?,
                })
            })
            .collect()
    }

    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        let conn = self.lock();
        let max: Option<String> = conn.query_row("SELECT MAX(date) FROM h8_data", [], |row| row.get(0))?;
        max.as_deref().map(parse_date).transpose()
    }

    fn record_update(&self, records_added: usize, status: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO data_updates (update_date, records_added, status) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), records_added as i64, status],
        )?;
        debug!(records_added, status, "Recorded update");
        Ok(())
    }

    fn recent_updates(&self, limit: usize) -> Result<Vec<UpdateRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT update_date, records_added, status FROM data_updates ORDER BY id DESC LIMIT ?1",
        )?;
        let raw = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(ts, records_added, status)| {
                let updated_at = DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| StoreError::BadDate(ts.clone()))?;
                Ok(UpdateRecord {
                    updated_at,
                    records_added: records_added.max(0) as usize,
                    status,
                })
            })
            .collect()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|_| StoreError::BadDate(s.to_string()))
}
