use docnote_schemas::text::{char_len, contains_ignore_case};
use docnote_schemas::{Card, Concept, ConceptSource};
use tracing::{debug, warn};

use crate::sections::{core_keywords, relevant_sentences};
use crate::templates::TemplateRenderer;
use crate::SummaryLookup;

const EXAMPLE_MARKERS: &[&str] = &[
    "for example",
    "for instance",
    "e.g.",
    "such as",
    "例如",
    "比如",
    "举例",
    "譬如",
];

/// Expands a concept into a four-field learning card.
pub struct CardBuilder {
    renderer: TemplateRenderer,
}

impl Default for CardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CardBuilder {
    pub fn new() -> Self {
        Self {
            renderer: TemplateRenderer::new(),
        }
    }

    /// Re-fetch the owning analysis and build the card. Lookup misses and
    /// errors degrade to an empty summary, so this never fails.
    pub async fn build(
        &self,
        concept: &Concept,
        analysis_id: i64,
        lookup: &dyn SummaryLookup,
    ) -> Card {
        let summary = match lookup.fetch_summary(analysis_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                warn!("Analysis {} not found, building card from templates", analysis_id);
                String::new()
            }
            Err(e) => {
                warn!("Failed to fetch analysis {}: {}, building card from templates", analysis_id, e);
                String::new()
            }
        };

        self.build_from_summary(concept, &summary)
    }

    pub fn build_from_summary(&self, concept: &Concept, summary: &str) -> Card {
        let name = concept.concept.trim();
        let sentences = relevant_sentences(summary);

        let explanation = self
            .find_explanation(concept, summary, &sentences)
            .unwrap_or_else(|| self.renderer.explanation(name));

        let example = sentences
            .iter()
            .find(|s| EXAMPLE_MARKERS.iter().any(|m| contains_ignore_case(s, m)))
            .cloned()
            .unwrap_or_else(|| self.renderer.example(name));

        debug!("Built card for concept '{}' ({})", name, concept.source);

        Card {
            title: name.to_string(),
            concept: explanation,
            example,
            application: self.renderer.application(name, concept.source),
        }
    }

    fn find_explanation(
        &self,
        concept: &Concept,
        summary: &str,
        sentences: &[String],
    ) -> Option<String> {
        let name = concept.concept.trim();
        if name.is_empty() {
            return None;
        }

        let mentions = sentences.iter().filter(|s| contains_ignore_case(s, name));

        let found: Vec<&String> = match concept.source {
            ConceptSource::SmartSummary => mentions.take(2).collect(),
            ConceptSource::Keywords => {
                // Skip the keyword list itself; only prose around the keyword explains it
                let keyword_list = core_keywords(summary).unwrap_or_default();
                mentions
                    .filter(|s| char_len(s) >= 10)
                    .filter(|s| keyword_list.is_empty() || !keyword_list.contains(s.as_str()))
                    .take(1)
                    .collect()
            }
            ConceptSource::FilteredAnalysis | ConceptSource::Fallback => mentions.take(1).collect(),
        };

        if found.is_empty() {
            None
        } else {
            Some(
                found
                    .into_iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }
}
