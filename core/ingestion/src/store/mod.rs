//! Analysis persistence over two interchangeable SQL engines.
//!
//! [`AnalysisStore`] owns the SQL text and speaks to whichever
//! [`SqlBackend`] was chosen at startup. Dialect differences stay small:
//! placeholder style, identifier quoting, the case-insensitive match
//! operator and the "now" expression.

mod postgres;
mod sqlite;

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use docnote_composer::SummaryLookup;
use docnote_schemas::AnalysisRecord;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

const TABLE: &str = "analyses";
const COLUMNS: &str = "id, analysis_summary, content_text, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// 1-based positional parameter
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite => format!("`{}`", ident),
            Dialect::Postgres => format!("\"{}\"", ident),
        }
    }

    pub fn like_ci(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "LIKE",
            Dialect::Postgres => "ILIKE",
        }
    }

    pub fn now(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            Dialect::Postgres => "NOW()",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Id of the inserted row, for inserts
    pub last_id: Option<i64>,
    /// Rows affected
    pub changes: u64,
}

/// Minimal engine abstraction: write statements, row queries, schema setup.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn init_schema(&self) -> Result<()>;

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult>;

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<AnalysisRecord>>;

    async fn get(&self, sql: &str, params: &[SqlValue]) -> Result<Option<AnalysisRecord>> {
        Ok(self.all(sql, params).await?.into_iter().next())
    }
}

pub(crate) fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|head| head.eq_ignore_ascii_case("insert"))
        .unwrap_or(false)
}

/// Escape `%`, `_` and `\` so user input matches literally under `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Repository for analysis records
#[derive(Clone)]
pub struct AnalysisStore {
    backend: Arc<dyn SqlBackend>,
}

impl AnalysisStore {
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self { backend }
    }

    /// Open the configured engine and make sure the table exists.
    pub async fn connect(config: &DatabaseConfig, strict_tls: bool) -> Result<Self> {
        let backend: Arc<dyn SqlBackend> = match config {
            DatabaseConfig::Sqlite { path } => Arc::new(SqliteBackend::open(path)?),
            DatabaseConfig::Postgres { url } => {
                Arc::new(PostgresBackend::connect(url, strict_tls).await?)
            }
        };

        let store = Self::new(backend);
        store.init().await?;
        info!("Analysis store ready ({})", store.dialect().as_str());
        Ok(store)
    }

    pub async fn init(&self) -> Result<()> {
        self.backend
            .init_schema()
            .await
            .context("Failed to initialize analysis schema")
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    fn table(&self) -> String {
        self.dialect().quote(TABLE)
    }

    pub async fn insert(&self, analysis_summary: &str, content_text: &str) -> Result<i64> {
        let d = self.dialect();
        let sql = format!(
            "INSERT INTO {} (analysis_summary, content_text) VALUES ({}, {})",
            self.table(),
            d.placeholder(1),
            d.placeholder(2)
        );

        let result = self
            .backend
            .run(&sql, &[analysis_summary.into(), content_text.into()])
            .await
            .context("Failed to insert analysis")?;

        let id = result
            .last_id
            .context("Insert did not report a row id")?;
        debug!("Inserted analysis {}", id);
        Ok(id)
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<AnalysisRecord>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC",
            COLUMNS,
            self.table()
        );
        self.backend.all(&sql, &[]).await
    }

    /// Case-insensitive substring match on summary or content. An empty
    /// keyword matches everything.
    pub async fn search(&self, keyword: &str) -> Result<Vec<AnalysisRecord>> {
        let d = self.dialect();
        let p = d.placeholder(1);
        let sql = format!(
            "SELECT {cols} FROM {table} \
             WHERE analysis_summary {like} {p} ESCAPE '\\' OR content_text {like} {p} ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC",
            cols = COLUMNS,
            table = self.table(),
            like = d.like_ci(),
            p = p,
        );
        let pattern = format!("%{}%", escape_like(keyword));
        self.backend.all(&sql, &[pattern.into()]).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<AnalysisRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = {}",
            COLUMNS,
            self.table(),
            self.dialect().placeholder(1)
        );
        self.backend.get(&sql, &[id.into()]).await
    }

    /// Replace both text fields and bump `updated_at`. Returns rows changed.
    pub async fn update(&self, id: i64, analysis_summary: &str, content_text: &str) -> Result<u64> {
        let d = self.dialect();
        let sql = format!(
            "UPDATE {} SET analysis_summary = {}, content_text = {}, updated_at = {} WHERE id = {}",
            self.table(),
            d.placeholder(1),
            d.placeholder(2),
            d.now(),
            d.placeholder(3)
        );
        let result = self
            .backend
            .run(&sql, &[analysis_summary.into(), content_text.into(), id.into()])
            .await?;
        Ok(result.changes)
    }

    /// Returns rows deleted.
    pub async fn delete(&self, id: i64) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE id = {}",
            self.table(),
            self.dialect().placeholder(1)
        );
        let result = self.backend.run(&sql, &[id.into()]).await?;
        Ok(result.changes)
    }
}

#[async_trait]
impl SummaryLookup for AnalysisStore {
    async fn fetch_summary(&self, analysis_id: i64) -> Result<Option<String>> {
        Ok(self.get(analysis_id).await?.map(|r| r.analysis_summary))
    }
}
