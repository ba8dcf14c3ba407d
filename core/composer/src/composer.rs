use anyhow::Result;
use docnote_schemas::{Card, CardNoteBundle, Concept, Connection};
use tracing::{debug, info};

use crate::cards::CardBuilder;
use crate::concepts::ConceptExtractor;
use crate::connections::ConnectionBuilder;
use crate::SummaryLookup;

/// Card-note composer. Exposes each stage on its own and a one-shot
/// `generate` that runs all three against a single fetch of the summary.
pub struct Composer {
    concepts: ConceptExtractor,
    cards: CardBuilder,
    connections: ConnectionBuilder,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self {
            concepts: ConceptExtractor::new(),
            cards: CardBuilder::new(),
            connections: ConnectionBuilder::new(),
        }
    }

    pub fn extract_concepts(&self, summary: &str) -> Vec<Concept> {
        self.concepts.extract(summary)
    }

    /// One card per concept; each card re-fetches the analysis on its own.
    pub async fn create_cards(
        &self,
        concepts: &[Concept],
        analysis_id: i64,
        lookup: &dyn SummaryLookup,
    ) -> Vec<Card> {
        let mut cards = Vec::with_capacity(concepts.len());
        for concept in concepts {
            cards.push(self.cards.build(concept, analysis_id, lookup).await);
        }
        debug!("Created {} cards for analysis {}", cards.len(), analysis_id);
        cards
    }

    pub fn create_connections(&self, cards: &[Card]) -> Vec<Connection> {
        self.connections.build(cards)
    }

    /// Run the whole pipeline server-side. Fails only when the analysis
    /// cannot be loaded.
    pub async fn generate(
        &self,
        analysis_id: i64,
        lookup: &dyn SummaryLookup,
    ) -> Result<CardNoteBundle> {
        let summary = lookup
            .fetch_summary(analysis_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Analysis {} not found", analysis_id))?;

        let concepts = self.concepts.extract(&summary);
        let cards: Vec<Card> = concepts
            .iter()
            .map(|concept| self.cards.build_from_summary(concept, &summary))
            .collect();
        let connections = self.connections.build(&cards);

        info!(
            "Generated card notes for analysis {}: {} concepts, {} cards, {} connections",
            analysis_id,
            concepts.len(),
            cards.len(),
            connections.len()
        );

        Ok(CardNoteBundle {
            concepts,
            cards,
            connections,
        })
    }
}
