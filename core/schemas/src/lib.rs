use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod text;

// ============================================================================
// Analysis Record Schema
// ============================================================================

/// One persisted analysis: the Markdown report plus the raw extracted text it
/// was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub analysis_summary: String,
    pub content_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// True until the record has gone through an explicit edit.
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// Header placed in front of each file's text inside `content_text`.
pub fn file_delimiter(file_name: &str) -> String {
    format!("=== File: {} ===", file_name)
}

/// Join per-file extracted texts into the stored `content_text` layout.
pub fn combine_file_texts<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    files
        .into_iter()
        .map(|(name, text)| format!("{}\n{}\n", file_delimiter(name), text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inverse of [`combine_file_texts`]. Text before the first delimiter is
/// ignored, so plain text without delimiters yields no sections.
pub fn split_file_sections(content: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        let name = line
            .strip_prefix("=== File: ")
            .and_then(|rest| rest.strip_suffix(" ==="));

        if let Some(name) = name {
            if let Some((prev, body)) = current.take() {
                sections.push((prev, body.join("\n").trim().to_string()));
            }
            current = Some((name.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((name, body)) = current {
        sections.push((name, body.join("\n").trim().to_string()));
    }
    sections
}

// ============================================================================
// Card Note Schemas
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConceptSource {
    #[serde(rename = "smart_summary")]
    SmartSummary,
    #[serde(rename = "keywords")]
    Keywords,
    #[serde(rename = "filtered_analysis")]
    FilteredAnalysis,
    #[serde(rename = "fallback")]
    Fallback,
}

impl ConceptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptSource::SmartSummary => "smart_summary",
            ConceptSource::Keywords => "keywords",
            ConceptSource::FilteredAnalysis => "filtered_analysis",
            ConceptSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ConceptSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub concept: String,
    pub importance: Importance,
    pub source: ConceptSource,
}

impl Concept {
    pub fn new(concept: impl Into<String>, importance: Importance, source: ConceptSource) -> Self {
        Self {
            concept: concept.into(),
            importance,
            source,
        }
    }
}

/// Learning card built from one concept. `concept` carries the explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub concept: String,
    pub example: String,
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub relationship: String,
}

/// All three pipeline outputs for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardNoteBundle {
    pub concepts: Vec<Concept>,
    pub cards: Vec<Card>,
    pub connections: Vec<Connection>,
}

// ============================================================================
// API Request Schemas
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAnalysisRequest {
    pub analysis_summary: String,
    pub content_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConceptsRequest {
    #[serde(rename = "analysisId", deserialize_with = "deserialize_id")]
    pub analysis_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardsRequest {
    pub concepts: Vec<Concept>,
    #[serde(rename = "analysisId", deserialize_with = "deserialize_id")]
    pub analysis_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConnectionsRequest {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

/// Browsers send ids both as numbers and as strings read back from the DOM.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid analysis id: {:?}", raw))),
    }
}
