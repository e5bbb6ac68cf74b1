use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::schema;
use crate::types::{QuoteRecord, QuoteSummary};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Keyed persistence of quote records.
pub trait QuoteStore {
    /// Insert or replace the record with the same `(year, number)`. Returns its id.
    fn save(&self, record: &QuoteRecord) -> Result<i64>;
    /// Most recently created first, optionally restricted to one year.
    fn list(&self, year: Option<i32>, limit: usize) -> Result<Vec<QuoteSummary>>;
    fn get(&self, id: i64) -> Result<Option<QuoteRecord>>;
    /// Returns whether a record was removed.
    fn delete(&self, id: i64) -> Result<bool>;
}

/// [`QuoteStore`] over a caller-supplied SQLite connection.
#[derive(Debug)]
pub struct SqliteQuoteStore {
    conn: Connection,
}

impl SqliteQuoteStore {
    /// Take ownership of `conn` and create the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Id of the record stored under `(year, number)`.
    pub fn find(&self, year: i32, number: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM quotes WHERE year = ?1 AND number = ?2",
                params![year, number],
                |r| r.get(0),
            )
            .optional()?)
    }
}

impl QuoteStore for SqliteQuoteStore {
    fn save(&self, record: &QuoteRecord) -> Result<i64> {
        let payload = serde_json::to_string(&record.payload)?;
        let id = self.conn.query_row(
            r#"
            INSERT INTO quotes (year, number, issue_date, client_name, project_name, total, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (year, number) DO UPDATE SET
              issue_date = excluded.issue_date,
              client_name = excluded.client_name,
              project_name = excluded.project_name,
              total = excluded.total,
              payload = excluded.payload,
              saved_at = CURRENT_TIMESTAMP
            RETURNING id
            "#,
            params![
                record.year,
                record.number,
                record.issue_date,
                record.client_name,
                record.project_name,
                record.total,
                payload,
            ],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn list(&self, year: Option<i32>, limit: usize) -> Result<Vec<QuoteSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, year, number, issue_date, client_name, total
            FROM quotes
            WHERE ?1 IS NULL OR year = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![year, limit], summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get(&self, id: i64) -> Result<Option<QuoteRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT year, number, issue_date, client_name, project_name, total, payload
                FROM quotes WHERE id = ?1
                "#,
                params![id],
                |r| {
                    Ok((
                        r.get::<_, i32>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, Option<NaiveDate>>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, f64>(5)?,
                        r.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((year, number, issue_date, client_name, project_name, total, payload)) = row else {
            return Ok(None);
        };
        Ok(Some(QuoteRecord {
            year,
            number,
            issue_date,
            client_name,
            project_name,
            total,
            payload: serde_json::from_str(&payload)?,
        }))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM quotes WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

fn summary_from_row(r: &Row<'_>) -> rusqlite::Result<QuoteSummary> {
    Ok(QuoteSummary {
        id: r.get(0)?,
        year: r.get(1)?,
        number: r.get(2)?,
        issue_date: r.get(3)?,
        client_name: r.get(4)?,
        total: r.get(5)?,
    })
}
