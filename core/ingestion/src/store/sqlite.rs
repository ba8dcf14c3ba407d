use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use docnote_schemas::AnalysisRecord;
use rusqlite::types::{ToSqlOutput, Type};
use rusqlite::{params_from_iter, Connection, Row, ToSql};
use tokio::sync::Mutex;
use tracing::info;

use super::{is_insert, Dialect, RunResult, SqlBackend, SqlValue};

/// Embedded single-file engine. One connection, serialized behind a mutex.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        info!("SQLite database opened at: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Int(value) => ToSqlOutput::from(*value),
            SqlValue::Text(value) => ToSqlOutput::from(value.as_str()),
        })
    }
}

#[async_trait]
impl SqlBackend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS `analyses` (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                analysis_summary TEXT NOT NULL,
                content_text TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON `analyses`(created_at DESC);",
        )?;
        Ok(())
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        let conn = self.conn.lock().await;
        let changes = conn.execute(sql, params_from_iter(params.iter()))?;
        let last_id = is_insert(sql).then(|| conn.last_insert_rowid());

        Ok(RunResult {
            last_id,
            changes: changes as u64,
        })
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &Row) -> rusqlite::Result<AnalysisRecord> {
    Ok(AnalysisRecord {
        id: row.get(0)?,
        analysis_summary: row.get(1)?,
        content_text: row.get(2)?,
        created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
        updated_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

/// RFC 3339 as written by the column defaults; the bare
/// `YYYY-MM-DD HH:MM:SS` form of CURRENT_TIMESTAMP is read as UTC.
fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
        })
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
