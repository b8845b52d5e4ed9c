use crate::calculator::{Region, UsageInput};
use crate::entries::{CarbonEntry, DEFAULT_MONTHLY_GOAL, NewEntry};
use crate::history::HistoricalEntry;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use time::Date;
use time::macros::format_description;
use tracing::info;

pub struct FootprintStore {
    conn: Connection,
}

/// A monthly reading plus the footprint computed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub uid: String,
    pub user: String,
    pub date: Date,
    pub input: UsageInput,
    pub total_emission: f64,
}

#[derive(Debug, Error)]
pub enum GoalError {
    #[error("Please provide a valid monthly goal (got {0})")]
    Invalid(f64),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_column<T: std::str::FromStr>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl FootprintStore {
    /// Open (or create) the store. `":memory:"` gives a throwaway database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS readings (
                uid TEXT PRIMARY KEY,
                user TEXT NOT NULL,
                date TEXT NOT NULL,
                electricity REAL NOT NULL DEFAULT 0,
                natural_gas REAL NOT NULL DEFAULT 0,
                water REAL NOT NULL DEFAULT 0,
                waste REAL NOT NULL DEFAULT 0,
                transportation REAL NOT NULL DEFAULT 0,
                household_size INTEGER NOT NULL DEFAULT 1,
                region TEXT NOT NULL DEFAULT 'other',
                total_emission REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                description TEXT NOT NULL,
                quantity REAL NOT NULL,
                unit TEXT NOT NULL,
                carbon_emission REAL NOT NULL,
                date TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS goals (
                user TEXT PRIMARY KEY,
                monthly_goal REAL NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_readings_user_date ON readings(user, date)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_user ON entries(user)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Stable ID for one reading: the same user, date and usage hash alike.
    pub fn generate_uid(user: &str, date: Date, electricity: f64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(user.as_bytes());
        hasher.update(format_date(date).as_bytes());
        hasher.update(electricity.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Insert or update a reading; returns its uid.
    pub fn record_reading(
        &self,
        user: &str,
        date: Date,
        input: &UsageInput,
        total_emission: f64,
    ) -> SqliteResult<String> {
        let uid = Self::generate_uid(user, date, input.electricity);
        self.conn.execute(
            "INSERT INTO readings
                (uid, user, date, electricity, natural_gas, water, waste, transportation,
                 household_size, region, total_emission)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(uid) DO UPDATE SET
                natural_gas = excluded.natural_gas,
                water = excluded.water,
                waste = excluded.waste,
                transportation = excluded.transportation,
                household_size = excluded.household_size,
                region = excluded.region,
                total_emission = excluded.total_emission",
            params![
                uid,
                user,
                format_date(date),
                input.electricity,
                input.natural_gas,
                input.water,
                input.waste,
                input.transportation,
                input.household_size,
                input.region.as_str(),
                total_emission,
            ],
        )?;
        info!(uid = %uid, user = %user, "Reading stored");
        Ok(uid)
    }

    /// All readings for a user, oldest first.
    pub fn readings_for(&self, user: &str) -> SqliteResult<Vec<StoredReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, user, date, electricity, natural_gas, water, waste, transportation,
                    household_size, region, total_emission
             FROM readings
             WHERE user = ?1
             ORDER BY date ASC, created_at ASC",
        )?;

        let rows = stmt.query_map(params![user], |row| {
            let date: String = row.get(2)?;
            let region: String = row.get(9)?;
            Ok(StoredReading {
                uid: row.get(0)?,
                user: row.get(1)?,
                date: parse_date(2, &date)?,
                input: UsageInput {
                    electricity: row.get(3)?,
                    natural_gas: row.get(4)?,
                    water: row.get(5)?,
                    waste: row.get(6)?,
                    transportation: row.get(7)?,
                    household_size: row.get(8)?,
                    region: Region::parse_lossy(&region),
                },
                total_emission: row.get(10)?,
            })
        })?;
        rows.collect()
    }

    /// Electricity history in the shape the analyser wants, oldest first.
    pub fn history_for(&self, user: &str) -> SqliteResult<Vec<HistoricalEntry>> {
        Ok(self
            .readings_for(user)?
            .into_iter()
            .map(|r| HistoricalEntry {
                electricity: Some(r.input.electricity),
                date: r.date,
            })
            .collect())
    }

    /// Electricity history strictly before `date`, oldest first.
    pub fn history_before(&self, user: &str, date: Date) -> SqliteResult<Vec<HistoricalEntry>> {
        Ok(self
            .history_for(user)?
            .into_iter()
            .filter(|h| h.date < date)
            .collect())
    }

    /// Store a validated entry and return it with its new id.
    pub fn insert_entry(&self, user: &str, entry: &NewEntry) -> SqliteResult<CarbonEntry> {
        let carbon_emission = entry.carbon_emission();
        self.conn.execute(
            "INSERT INTO entries (user, entry_type, description, quantity, unit, carbon_emission, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user,
                entry.entry_type.as_str(),
                entry.description,
                entry.quantity,
                entry.unit.as_str(),
                carbon_emission,
                format_date(entry.date),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            entry_id = id,
            user = %user,
            entry_type = %entry.entry_type,
            carbon_emission,
            "Entry stored"
        );
        Ok(CarbonEntry {
            id,
            user: user.to_string(),
            entry_type: entry.entry_type,
            description: entry.description.clone(),
            quantity: entry.quantity,
            unit: entry.unit,
            carbon_emission,
            date: entry.date,
        })
    }

    pub fn entries_for(&self, user: &str) -> SqliteResult<Vec<CarbonEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user, entry_type, description, quantity, unit, carbon_emission, date
             FROM entries
             WHERE user = ?1
             ORDER BY date ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user], |row| Self::row_to_entry(row))?;
        rows.collect()
    }

    /// Delete one of the user's entries. `false` if no such entry belongs to them.
    pub fn delete_entry(&self, user: &str, id: i64) -> SqliteResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM entries WHERE id = ?1 AND user = ?2",
            params![id, user],
        )?;
        info!(entry_id = id, user = %user, removed, "Entry delete requested");
        Ok(removed > 0)
    }

    /// Helper: map the 8-column entry projection to `CarbonEntry`.
    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CarbonEntry> {
        let entry_type: String = row.get(2)?;
        let unit: String = row.get(5)?;
        let date: String = row.get(7)?;
        Ok(CarbonEntry {
            id: row.get(0)?,
            user: row.get(1)?,
            entry_type: parse_column(2, &entry_type)?,
            description: row.get(3)?,
            quantity: row.get(4)?,
            unit: parse_column(5, &unit)?,
            carbon_emission: row.get(6)?,
            date: parse_date(7, &date)?,
        })
    }

    pub fn set_monthly_goal(&self, user: &str, goal: f64) -> Result<(), GoalError> {
        if !goal.is_finite() || goal <= 0.0 {
            return Err(GoalError::Invalid(goal));
        }
        self.conn.execute(
            "INSERT INTO goals (user, monthly_goal) VALUES (?1, ?2)
             ON CONFLICT(user) DO UPDATE SET
                monthly_goal = excluded.monthly_goal,
                updated_at = CURRENT_TIMESTAMP",
            params![user, goal],
        )?;
        info!(user = %user, goal, "Monthly goal set");
        Ok(())
    }

    /// The user's monthly goal in kg CO2, or the default when none was set.
    pub fn monthly_goal(&self, user: &str) -> SqliteResult<f64> {
        let goal: Option<f64> = self
            .conn
            .query_row(
                "SELECT monthly_goal FROM goals WHERE user = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()?;
        Ok(goal.unwrap_or(DEFAULT_MONTHLY_GOAL))
    }

    /// Get count of stored readings and entries
    pub fn get_counts(&self) -> SqliteResult<(usize, usize)> {
        let readings: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;

        let entries: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;

        Ok((readings, entries))
    }
}
