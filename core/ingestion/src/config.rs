use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "data/analyses.db";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_OCR_LANGUAGES: &str = "chi_sim+eng";
pub const DEFAULT_EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Which relational engine backs the analysis store. Chosen once at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    /// Embedded single-file store
    Sqlite { path: PathBuf },
    /// Networked store, selected by the presence of a connection string
    Postgres { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub ocr_languages: String,
    pub command_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            command_timeout_secs: DEFAULT_EXTRACTION_CMD_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    /// Runtime mode; only affects TLS strictness on the networked store.
    pub app_env: String,
    pub max_upload_bytes: usize,
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        let database = match get("DATABASE_URL") {
            Some(url) => DatabaseConfig::Postgres { url },
            None => DatabaseConfig::Sqlite {
                path: get("DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            },
        };

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a byte count, got {:?}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let command_timeout_secs = match get("EXTRACTION_CMD_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("EXTRACTION_CMD_TIMEOUT_SECS must be seconds, got {:?}", raw)
            })?,
            None => DEFAULT_EXTRACTION_CMD_TIMEOUT_SECS,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database,
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            max_upload_bytes,
            extraction: ExtractionConfig {
                ocr_languages: get("OCR_LANGUAGES")
                    .unwrap_or_else(|| DEFAULT_OCR_LANGUAGES.to_string()),
                command_timeout_secs,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from(DEFAULT_DB_PATH)
            }
        );
        assert!(!config.is_production());
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_database_url_switches_engine() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://user:pw@localhost/docs"),
            ("DB_PATH", "/tmp/ignored.db"),
            ("APP_ENV", "Production"),
        ])
        .unwrap();

        assert_eq!(
            config.database,
            DatabaseConfig::Postgres {
                url: "postgres://user:pw@localhost/docs".to_string()
            }
        );
        assert!(config.is_production());
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let config = config_from(&[("DATABASE_URL", "  "), ("DB_PATH", "/tmp/a.db")]).unwrap();
        assert_eq!(
            config.database,
            DatabaseConfig::Sqlite {
                path: PathBuf::from("/tmp/a.db")
            }
        );
    }

    #[test]
    fn test_port_override_and_invalid_port() {
        assert_eq!(config_from(&[("PORT", "8080")]).unwrap().port, 8080);
        assert!(config_from(&[("PORT", "eighty")]).is_err());
    }
}
