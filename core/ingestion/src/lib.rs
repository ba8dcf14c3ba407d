pub mod analyzer;
pub mod config;
pub mod extractor;
pub mod ocr;
pub mod server;
pub mod store;
pub mod summarizer;

pub use analyzer::{AnalysisReport, HeuristicAnalyzer, SummarySource};
pub use config::{AppConfig, DatabaseConfig, ExtractionConfig};
pub use extractor::{DocumentKind, ExtractError, TextExtractor};
pub use server::{router, AppState};
pub use store::{AnalysisStore, Dialect, RunResult, SqlBackend, SqlValue, SqliteBackend};
pub use summarizer::{LLMConfig, LLMSummarizer, Summarizer};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber for the server. `RUST_LOG` overrides
/// the `info` default.
pub fn init_tracing() {
    init_tracing_with("info", std::io::stdout);
}

/// Shared subscriber setup for every binary; only the default level and
/// the output stream differ.
pub fn init_tracing_with<W>(default_directive: &str, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref(), default_directive))
        .with_writer(writer)
        .with_target(false)
        .init();
}

fn env_filter(rust_log: Option<&str>, default_directive: &str) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_defaults_and_overrides() {
        assert_eq!(env_filter(None, "warn").to_string(), "warn");
        assert_eq!(env_filter(Some("  "), "info").to_string(), "info");
        assert_eq!(env_filter(Some("debug"), "warn").to_string(), "debug");
    }
}
