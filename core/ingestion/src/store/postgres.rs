use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use docnote_schemas::AnalysisRecord;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use tracing::info;

use super::{is_insert, Dialect, RunResult, SqlBackend, SqlValue};

/// Networked engine over a small connection pool.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// `strict_tls` requires an encrypted connection; otherwise TLS is
    /// attempted and plaintext accepted.
    pub async fn connect(url: &str, strict_tls: bool) -> Result<Self> {
        let ssl_mode = if strict_tls {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let options = PgConnectOptions::from_str(url)
            .context("Invalid DATABASE_URL")?
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("PostgreSQL pool ready (ssl mode {:?})", ssl_mode);
        Ok(Self { pool })
    }
}

/// Postgres has no last-insert-id, so inserts ask for the id back instead.
/// Statements that are not inserts, or already say `RETURNING`, pass through.
pub(crate) fn with_returning_id(sql: &str) -> Cow<'_, str> {
    if is_insert(sql) && !sql.to_ascii_uppercase().contains("RETURNING") {
        Cow::Owned(format!("{} RETURNING id", sql.trim_end()))
    } else {
        Cow::Borrowed(sql)
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Int(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn row_to_record(row: &PgRow) -> Result<AnalysisRecord, sqlx::Error> {
    Ok(AnalysisRecord {
        id: row.try_get("id")?,
        analysis_summary: row.try_get("analysis_summary")?,
        content_text: row.try_get("content_text")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS "analyses" (
                id BIGSERIAL PRIMARY KEY,
                analysis_summary TEXT NOT NULL,
                content_text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON "analyses"(created_at DESC)"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        if is_insert(sql) {
            let sql = with_returning_id(sql);
            let row = bind_params(sqlx::query(&sql), params)
                .fetch_one(&self.pool)
                .await?;
            let id: i64 = row.try_get("id")?;
            return Ok(RunResult {
                last_id: Some(id),
                changes: 1,
            });
        }

        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;

        Ok(RunResult {
            last_id: None,
            changes: result.rows_affected(),
        })
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<AnalysisRecord>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode analysis row")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_returning_id() {
        assert_eq!(
            with_returning_id(r#"INSERT INTO "analyses" (analysis_summary) VALUES ($1) "#),
            r#"INSERT INTO "analyses" (analysis_summary) VALUES ($1) RETURNING id"#
        );

        let explicit = r#"insert into "analyses" (content_text) values ($1) returning id"#;
        assert!(matches!(with_returning_id(explicit), Cow::Borrowed(s) if s == explicit));

        let update = r#"UPDATE "analyses" SET content_text = $1 WHERE id = $2"#;
        assert!(matches!(with_returning_id(update), Cow::Borrowed(s) if s == update));
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a scratch database
    async fn test_live_round_trip() -> Result<()> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return Ok(());
        };
        let store = crate::store::AnalysisStore::connect(
            &crate::config::DatabaseConfig::Postgres { url },
            false,
        )
        .await?;

        let id = store.insert("Postgres 100% round trip", "body").await?;
        let record = store.get(id).await?.context("inserted row missing")?;
        assert_eq!(record.analysis_summary, "Postgres 100% round trip");
        assert_eq!(record.created_at, record.updated_at);

        let hits = store.search("100%").await?;
        assert!(hits.iter().any(|r| r.id == id));

        assert_eq!(store.update(id, "edited", "body").await?, 1);
        let record = store.get(id).await?.context("updated row missing")?;
        assert!(record.updated_at > record.created_at);

        assert_eq!(store.delete(id).await?, 1);
        assert!(store.get(id).await?.is_none());
        Ok(())
    }
}
