//! Analyze local documents without running the server.
//!
//! Usage:
//!   docnote-analyze <FILES>... [--store] [--db-path <path>] [--json]
//!
//! Prints the Markdown report. With `--store` the result is saved using the
//! same engine selection as the server (`DATABASE_URL`, `DB_PATH`), unless
//! `--db-path` points at a specific SQLite file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docnote_ingestion::{
    init_tracing_with, AnalysisStore, AppConfig, DatabaseConfig, HeuristicAnalyzer, LLMSummarizer,
    Summarizer, TextExtractor,
};
use docnote_schemas::combine_file_texts;
use serde_json::json;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "docnote-analyze")]
#[command(about = "Extract text from documents and print an analysis report")]
struct Args {
    /// Files to analyze, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Save the analysis to the store
    #[arg(long)]
    store: bool,

    /// SQLite database file to store into (implies --store)
    #[arg(long, short)]
    db_path: Option<PathBuf>,

    /// Print the result as JSON instead of Markdown
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the report can be piped
    init_tracing_with("warn", std::io::stderr);

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let extractor = TextExtractor::new(config.extraction.clone());
    let summarizer = LLMSummarizer::from_env_optional()
        .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
    let analyzer = HeuristicAnalyzer::new(summarizer);

    let mut files: Vec<(String, String)> = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file path: {}", path.display()))?;

        info!("Extracting {}", path.display());
        let text = extractor.extract(path, &name).await;
        files.push((name, text));
    }

    let file_names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
    let content_text =
        combine_file_texts(files.iter().map(|(name, text)| (name.as_str(), text.as_str())));
    let analysis = analyzer.analyze(&content_text, &file_names).await.to_markdown();

    let id = if args.store || args.db_path.is_some() {
        let database = match args.db_path {
            Some(path) => DatabaseConfig::Sqlite { path },
            None => config.database.clone(),
        };
        let store = AnalysisStore::connect(&database, config.is_production()).await?;
        let id = store.insert(&analysis, &content_text).await?;
        info!("Stored analysis {}", id);
        Some(id)
    } else {
        None
    };

    if args.json {
        let output = json!({
            "id": id,
            "files": file_names,
            "analysis_summary": analysis,
            "content_text": content_text,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", analysis);
        if let Some(id) = id {
            eprintln!("Stored as analysis {}", id);
        }
    }

    Ok(())
}
