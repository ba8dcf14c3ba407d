use docnote_schemas::text::{char_len, split_sentences};
use docnote_schemas::{Concept, ConceptSource, Importance};
use regex::Regex;
use tracing::debug;

use crate::sections::{core_keywords, smart_summary, strip_boilerplate};

pub const MAX_CONCEPTS: usize = 5;
const MAX_SUMMARY_CONCEPTS: usize = 3;
const MAX_KEYWORD_CONCEPTS: usize = 4;
const MAX_FILTERED_CONCEPTS: usize = 3;

const INDICATOR_WORDS: &[&str] = &[
    "discuss", "analysis", "analyze", "suggest", "recommend", "key", "important", "main", "focus",
    "conclusion", "讨论", "分析", "建议", "关键", "重要", "主要", "核心", "结论",
];

const KEYWORD_STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "are", "was", "keywords", "core", "的",
    "了", "和", "是", "在", "关键词",
];

/// The three concepts emitted when nothing usable can be parsed.
pub fn fallback_concepts() -> Vec<Concept> {
    vec![
        Concept::new("Core Content Overview", Importance::High, ConceptSource::Fallback),
        Concept::new("Key Information Points", Importance::Medium, ConceptSource::Fallback),
        Concept::new("Practical Applications", Importance::Medium, ConceptSource::Fallback),
    ]
}

/// Parses a stored analysis report back into a short ordered concept list.
pub struct ConceptExtractor {
    term_pattern: Regex,
}

impl Default for ConceptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptExtractor {
    pub fn new() -> Self {
        Self {
            // Maximal Han runs or Latin runs; length is filtered afterwards
            term_pattern: Regex::new(r"\p{Han}+|[A-Za-z]+").unwrap(),
        }
    }

    /// Between 1 and 5 concepts, deterministic for a given summary layout.
    pub fn extract(&self, summary: &str) -> Vec<Concept> {
        let mut concepts = Vec::new();

        if let Some(section) = smart_summary(summary) {
            concepts.extend(self.from_smart_summary(&section));
        }

        if let Some(section) = core_keywords(summary) {
            concepts.extend(self.from_keywords(&section));
        }

        if concepts.is_empty() {
            concepts.extend(self.from_filtered_analysis(summary));
        }

        if concepts.is_empty() {
            debug!("No concepts found in summary, using fallback concepts");
            return fallback_concepts();
        }

        concepts.truncate(MAX_CONCEPTS);
        debug!("Extracted {} concepts", concepts.len());
        concepts
    }

    fn from_smart_summary(&self, section: &str) -> Vec<Concept> {
        split_sentences(section)
            .into_iter()
            .filter(|s| (8..=60).contains(&char_len(s)))
            .filter(|s| has_indicator(s))
            .take(MAX_SUMMARY_CONCEPTS)
            .map(|s| Concept::new(s, Importance::High, ConceptSource::SmartSummary))
            .collect()
    }

    fn from_keywords(&self, section: &str) -> Vec<Concept> {
        let mut seen: Vec<String> = Vec::new();
        let mut concepts = Vec::new();

        for term in self.term_pattern.find_iter(section).map(|m| m.as_str()) {
            if concepts.len() >= MAX_KEYWORD_CONCEPTS {
                break;
            }

            let lower = term.to_lowercase();
            if !(2..=15).contains(&char_len(term))
                || KEYWORD_STOPWORDS.contains(&lower.as_str())
                || seen.contains(&lower)
            {
                continue;
            }

            seen.push(lower);
            concepts.push(Concept::new(term, Importance::Medium, ConceptSource::Keywords));
        }

        concepts
    }

    fn from_filtered_analysis(&self, summary: &str) -> Vec<Concept> {
        split_sentences(&strip_boilerplate(summary))
            .into_iter()
            .filter(|s| (10..=50).contains(&char_len(s)))
            .take(MAX_FILTERED_CONCEPTS)
            .map(|s| Concept::new(s, Importance::Medium, ConceptSource::FilteredAnalysis))
            .collect()
    }
}

fn has_indicator(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    INDICATOR_WORDS.iter().any(|word| lower.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(summary: &str, keywords: &str) -> String {
        format!(
            "# Document Analysis Report\n\n**Files analyzed:** 1 (a.txt)\n\n\
             ## Smart Summary\n\n{}\n\n## Core Keywords\n\n{}\n\n\
             ## Key Points\n- nothing\n\n---\n*Summary generated by local heuristic analysis*\n",
            summary, keywords
        )
    }

    #[test]
    fn test_summary_and_keyword_concepts() {
        let extractor = ConceptExtractor::new();
        let summary = report(
            "The key finding is a memory leak. Lunch was served at noon. We suggest caching results.",
            "memory, leak, caching, the, results, latency",
        );

        let concepts = extractor.extract(&summary);
        assert_eq!(concepts.len(), 5);

        assert_eq!(concepts[0].concept, "The key finding is a memory leak.");
        assert_eq!(concepts[0].importance, Importance::High);
        assert_eq!(concepts[0].source, ConceptSource::SmartSummary);
        assert_eq!(concepts[1].concept, "We suggest caching results.");

        let keywords: Vec<&str> = concepts[2..].iter().map(|c| c.concept.as_str()).collect();
        assert_eq!(keywords, vec!["memory", "leak", "caching"]);
        assert!(concepts[2..]
            .iter()
            .all(|c| c.source == ConceptSource::Keywords && c.importance == Importance::Medium));
    }

    #[test]
    fn test_keyword_limit_and_dedup() {
        let extractor = ConceptExtractor::new();
        let summary = "## Core Keywords\nRust, rust, tokio, axum, serde, tracing, regex";
        let concepts = extractor.extract(summary);
        let names: Vec<&str> = concepts.iter().map(|c| c.concept.as_str()).collect();
        assert_eq!(names, vec!["Rust", "tokio", "axum", "serde"]);
    }

    #[test]
    fn test_han_keywords() {
        let extractor = ConceptExtractor::new();
        let concepts = extractor.extract("## 核心关键词\n数据分析, 的, 机器学习");
        let names: Vec<&str> = concepts.iter().map(|c| c.concept.as_str()).collect();
        assert_eq!(names, vec!["数据分析", "机器学习"]);
    }

    #[test]
    fn test_filtered_analysis_when_sections_missing() {
        let extractor = ConceptExtractor::new();
        let summary = "# Notes\nCompilers translate source code.\nShort.\n---\n";
        let concepts = extractor.extract(summary);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].concept, "Compilers translate source code.");
        assert_eq!(concepts[0].source, ConceptSource::FilteredAnalysis);
    }

    #[test]
    fn test_empty_summary_yields_fallback() {
        let extractor = ConceptExtractor::new();
        assert_eq!(extractor.extract(""), fallback_concepts());
        assert_eq!(extractor.extract("# Title\n---\n"), fallback_concepts());
    }

    #[test]
    fn test_never_more_than_five() {
        let extractor = ConceptExtractor::new();
        let summary = report(
            "Key point one is here. Key point two is here. Key point three is here. Key point four.",
            "alpha, beta, gamma, delta, epsilon",
        );
        let concepts = extractor.extract(&summary);
        assert_eq!(concepts.len(), MAX_CONCEPTS);
    }
}
