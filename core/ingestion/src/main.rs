use std::sync::Arc;

use anyhow::{Context, Result};
use docnote_ingestion::{
    init_tracing, router, AnalysisStore, AppConfig, AppState, HeuristicAnalyzer, LLMSummarizer,
    Summarizer, TextExtractor,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Document Analysis Service v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;
    let store = AnalysisStore::connect(&config.database, config.is_production()).await?;

    let summarizer = LLMSummarizer::from_env_optional()
        .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
    if let Some(summarizer) = &summarizer {
        info!("Remote summaries enabled ({})", summarizer.model_name());
    }

    let state = AppState::new(
        store,
        TextExtractor::new(config.extraction.clone()),
        HeuristicAnalyzer::new(summarizer),
    );
    let app = router(state, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
