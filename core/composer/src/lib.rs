pub mod cards;
pub mod composer;
pub mod concepts;
pub mod connections;
pub mod sections;
pub mod templates;

use anyhow::Result;
use async_trait::async_trait;

pub use cards::CardBuilder;
pub use composer::Composer;
pub use concepts::{fallback_concepts, ConceptExtractor, MAX_CONCEPTS};
pub use connections::ConnectionBuilder;
pub use templates::TemplateRenderer;

/// Source of stored analysis summaries for the card stage.
#[async_trait]
pub trait SummaryLookup: Send + Sync {
    /// `Ok(None)` when no analysis has this id.
    async fn fetch_summary(&self, analysis_id: i64) -> Result<Option<String>>;
}
