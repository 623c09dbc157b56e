use std::path::Path;

use indicatif::ProgressBar;
use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::record::{Applicant, WarehouseRecord};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

// ── Warehouse (pipeline destination) ──

pub fn init_warehouse_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                   INT PRIMARY KEY,
            age                  INT,
            number_of_dependants INT,
            income_lakhs         FLOAT,
            genetical_risk       VARCHAR(50),
            insurance_plan       VARCHAR(50),
            employment_status    VARCHAR(50),
            gender               VARCHAR(10),
            marital_status       VARCHAR(50),
            bmi_category         VARCHAR(50),
            smoking_status       VARCHAR(50),
            region               VARCHAR(50),
            medical_history      TEXT,
            created_at           TIMESTAMP
        );
        ",
    )?;
    Ok(())
}

/// Outcome of one load. `received - inserted` rows were skipped on id conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub received: usize,
    pub inserted: usize,
}

impl LoadReport {
    pub fn skipped(&self) -> usize {
        self.received - self.inserted
    }
}

/// Ensure the table exists, then insert the batch in one transaction.
/// Rows whose id is already present are left untouched.
pub fn load_records(
    conn: &Connection,
    records: &[WarehouseRecord],
    pb: &ProgressBar,
) -> Result<LoadReport> {
    init_warehouse_schema(conn)?;

    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO users
             (id, age, number_of_dependants, income_lakhs, genetical_risk,
              insurance_plan, employment_status, gender, marital_status,
              bmi_category, smoking_status, region, medical_history, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)
             ON CONFLICT (id) DO NOTHING",
        )?;
        for r in records {
            inserted += stmt.execute(rusqlite::params![
                r.id, r.age, r.number_of_dependants, r.income_lakhs, r.genetical_risk,
                r.insurance_plan, r.employment_status, r.gender, r.marital_status,
                r.bmi_category, r.smoking_status, r.region, r.medical_history, r.created_at,
            ])?;
            pb.inc(1);
        }
    }
    tx.commit()?;

    let report = LoadReport {
        received: records.len(),
        inserted,
    };
    info!(
        "Loaded {} records ({} skipped on id conflict)",
        report.inserted,
        report.skipped()
    );
    Ok(report)
}

// ── Capture (local form submissions) ──

pub fn init_capture_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            age                  INTEGER,
            number_of_dependants INTEGER,
            income_lakhs         INTEGER,
            genetical_risk       INTEGER,
            insurance_plan       TEXT,
            employment_status    TEXT,
            gender               TEXT,
            marital_status       TEXT,
            bmi_category         TEXT,
            smoking_status       TEXT,
            region               TEXT,
            medical_history      TEXT,
            timestamp            DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;
    Ok(())
}

/// Append one submission and return its surrogate key.
pub fn save_capture(conn: &Connection, a: &Applicant) -> Result<i64> {
    init_capture_schema(conn)?;
    conn.execute(
        "INSERT INTO users
         (age, number_of_dependants, income_lakhs, genetical_risk, insurance_plan,
          employment_status, gender, marital_status, bmi_category, smoking_status,
          region, medical_history)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        rusqlite::params![
            a.age,
            a.number_of_dependants,
            a.income_lakhs,
            a.genetical_risk,
            a.insurance_plan.label(),
            a.employment_status.label(),
            a.gender.label(),
            a.marital_status.label(),
            a.bmi_category.label(),
            a.smoking_status.label(),
            a.region.label(),
            a.medical_history.label(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Stats ──

/// Row count of the `users` table, or 0 when the table has not been created yet.
pub fn count_users(conn: &Connection) -> Result<usize> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users')",
        [],
        |r| r.get(0),
    )?;
    if !exists {
        return Ok(0);
    }
    let n: usize = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    Ok(n)
}
