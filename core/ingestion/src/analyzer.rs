use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use docnote_schemas::split_file_sections;
use docnote_schemas::text::{char_len, split_sentences, truncate_chars};
use regex::Regex;
use tracing::{debug, warn};

use crate::extractor::DocumentKind;
use crate::summarizer::Summarizer;

/// Characters of combined text sent to the remote summarizer.
pub const SUMMARY_INPUT_CHARS: usize = 2000;
const SUMMARY_SENTENCES: usize = 3;
const MIN_SUMMARY_SENTENCE_CHARS: usize = 10;
const KEYWORD_LIMIT: usize = 20;
const REPORTED_KEYWORDS: usize = 15;
const MAX_LISTED_ITEMS: usize = 5;
const LISTED_SENTENCE_CHARS: std::ops::RangeInclusive<usize> = 10..=200;
const MAX_SHARED_TOPIC_PAIRS: usize = 5;

pub const TOO_LITTLE_TEXT: &str = "The uploaded documents contain too little text to summarize.";

const STOPWORDS: &[&str] = &[
    "the", "and", "that", "this", "with", "from", "have", "would", "there", "could", "should",
    "about", "after", "before", "while", "since", "where", "which", "into", "using", "also",
    "because", "these", "those", "been", "being", "were", "does", "done", "make", "made", "when",
    "then", "than", "your", "their", "them", "they", "what", "ever", "over", "just", "more",
    "only", "each", "such", "very", "much", "like", "onto", "upon", "for", "are", "was", "not",
    "but", "you", "all", "can", "has", "had", "its", "our", "will", "may", "any", "some", "other",
    "file", "我们", "你们", "他们", "这个", "那个", "这些", "那些", "因为", "所以", "但是",
    "如果", "可以", "没有", "就是", "还是", "一个", "什么", "进行", "以及", "或者", "已经",
];

/// Where the Smart Summary paragraph came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarySource {
    Remote { model: String },
    Local,
}

/// Structured result of one analysis run, rendered to Markdown for storage.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub file_names: Vec<String>,
    pub summary: String,
    pub summary_source: SummarySource,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub key_points: Vec<String>,
    pub action_items: Vec<String>,
    pub relationships: Vec<String>,
}

impl AnalysisReport {
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Document Analysis Report\n\n");

        out.push_str(&format!(
            "**Files analyzed:** {} ({})\n\n",
            self.file_names.len(),
            self.file_names.join(", ")
        ));

        out.push_str("## Smart Summary\n\n");
        out.push_str(&self.summary);
        out.push_str("\n\n");

        out.push_str("## Core Keywords\n\n");
        if self.keywords.is_empty() {
            out.push_str("n/a");
        } else {
            let shown: Vec<&str> = self
                .keywords
                .iter()
                .take(REPORTED_KEYWORDS)
                .map(String::as_str)
                .collect();
            out.push_str(&shown.join(", "));
        }
        out.push_str("\n\n");

        push_list(&mut out, "Document Categories", &self.categories, "General Document");
        push_list(&mut out, "Key Points", &self.key_points, "No explicit key points detected.");
        push_list(&mut out, "Action Items", &self.action_items, "No action items detected.");
        push_list(
            &mut out,
            "Document Relationships",
            &self.relationships,
            "No relationships detected.",
        );

        out.push_str("---\n");
        match &self.summary_source {
            SummarySource::Remote { model } => {
                out.push_str(&format!("*Summary generated by {}*\n", model))
            }
            SummarySource::Local => out.push_str("*Summary generated by local heuristic analysis*\n"),
        }

        out
    }
}

/// Text with Markdown block markers removed from line starts and rule lines
/// dropped, so sentences copied into the report cannot open a heading.
fn markdown_prose(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.len() >= 3 && trimmed.chars().all(|c| matches!(c, '-' | '=' | '*' | '_')))
        })
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c.is_whitespace() || matches!(c, '#' | '>' | '*' | '-' | '+' | '•')
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_list(out: &mut String, heading: &str, items: &[String], empty: &str) {
    out.push_str(&format!("## {}\n\n", heading));
    if items.is_empty() {
        out.push_str(&format!("- {}\n", empty));
    }
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

/// Rule-based document analyzer with an optional remote summarizer
pub struct HeuristicAnalyzer {
    summarizer: Option<Arc<dyn Summarizer>>,
    token_cleaner: Regex,
    category_rules: Vec<(&'static str, Regex)>,
    key_point_patterns: Vec<Regex>,
    action_patterns: Vec<Regex>,
    cross_reference_pattern: Regex,
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HeuristicAnalyzer {
    pub fn new(summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self {
            summarizer,
            token_cleaner: Regex::new(r"[^\w\s]").unwrap(),
            category_rules: vec![
                (
                    "Technical Documentation",
                    Regex::new(r"(?i)\b(api|code|function|software|server|database|algorithm|deploy\w*|architecture)\b|代码|系统|接口|算法|部署").unwrap(),
                ),
                (
                    "Business & Finance",
                    Regex::new(r"(?i)\b(revenue|budget|profit|market|sales|invoice|customer|quarterly)\b|财务|预算|收入|市场|客户").unwrap(),
                ),
                (
                    "Academic & Research",
                    Regex::new(r"(?i)\b(research|study|hypothesis|experiment|abstract|methodology|dataset)\b|研究|实验|论文|假设").unwrap(),
                ),
                (
                    "Legal & Compliance",
                    Regex::new(r"(?i)\b(contract|agreement|clause|liability|compliance|regulation)\b|合同|协议|条款|法规").unwrap(),
                ),
                (
                    "Meeting Notes",
                    Regex::new(r"(?i)\b(meeting|agenda|minutes|attendees)\b|会议|议程|纪要").unwrap(),
                ),
                (
                    "Project Planning",
                    Regex::new(r"(?i)\b(milestone|timeline|roadmap|deadline|sprint)\b|里程碑|排期|进度").unwrap(),
                ),
                (
                    "Education & Learning",
                    Regex::new(r"(?i)\b(lesson|course|tutorial|student|exercise|lecture)\b|课程|教程|学习|练习").unwrap(),
                ),
            ],
            key_point_patterns: vec![
                Regex::new(r"(?i)\b(important|key|main|significant|essential|critical|conclusion|overall|notably|in summary)\b").unwrap(),
                Regex::new(r"(?i)\b(results?|findings?|shows?|demonstrates?|indicates?)\b").unwrap(),
                Regex::new(r"重要|关键|主要|核心|总结|结论|表明").unwrap(),
            ],
            action_patterns: vec![
                Regex::new(r"(?i)\b(todo|action item|need to|needs to|must|should|plan to|next steps?|follow up|deadline)\b").unwrap(),
                Regex::new(r"需要|必须|应该|计划|待办|下一步|截止").unwrap(),
            ],
            cross_reference_pattern: Regex::new(
                r"(?i)\b(see also|refer to|according to|as mentioned in|appendix|attachment|attached)\b|参见|详见|附件|根据",
            )
            .unwrap(),
        }
    }

    /// Analyze combined upload text. `text` may carry per-file delimiters;
    /// they are used for per-file comparisons and never appear in the output.
    pub async fn analyze(&self, text: &str, file_names: &[String]) -> AnalysisReport {
        let sections = split_file_sections(text);
        let body = if sections.is_empty() {
            text.to_string()
        } else {
            sections
                .iter()
                .map(|(_, body)| body.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        let prose = markdown_prose(&body);

        let (summary, summary_source) = self.summarize(&prose).await;
        let keywords = self.extract_keywords(&body);

        debug!(
            "Analyzed {} files: {} keywords, summary from {:?}",
            file_names.len(),
            keywords.len(),
            summary_source
        );

        AnalysisReport {
            file_names: file_names.to_vec(),
            summary,
            summary_source,
            keywords,
            categories: self.categorize(&body, file_names),
            key_points: self.matching_sentences(&prose, &self.key_point_patterns),
            action_items: self.matching_sentences(&prose, &self.action_patterns),
            relationships: self.relationships(&body, &sections, file_names),
        }
    }

    async fn summarize(&self, text: &str) -> (String, SummarySource) {
        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(truncate_chars(text, SUMMARY_INPUT_CHARS)).await {
                Ok(summary) => {
                    let summary = markdown_prose(&summary).trim().to_string();
                    if !summary.is_empty() {
                        return (
                            summary,
                            SummarySource::Remote {
                                model: summarizer.model_name().to_string(),
                            },
                        );
                    }
                    warn!("Remote summary was only Markdown markup, using local summary");
                }
                Err(e) => warn!("Remote summary failed, using local summary: {}", e),
            }
        }

        (self.local_summary(text), SummarySource::Local)
    }

    /// The longest sentences of at least ten characters, longest first.
    pub fn local_summary(&self, text: &str) -> String {
        let mut sentences: Vec<(usize, String)> = split_sentences(text)
            .into_iter()
            .filter(|s| char_len(s) >= MIN_SUMMARY_SENTENCE_CHARS)
            .enumerate()
            .collect();

        if sentences.is_empty() {
            return TOO_LITTLE_TEXT.to_string();
        }

        sentences.sort_by(|a, b| char_len(&b.1).cmp(&char_len(&a.1)).then(a.0.cmp(&b.0)));

        sentences
            .into_iter()
            .take(SUMMARY_SENTENCES)
            .map(|(_, s)| s)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Most frequent non-stopword tokens longer than two characters.
    /// Ties keep first-occurrence order.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let cleaned = self.token_cleaner.replace_all(&lowered, " ");

        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, token) in cleaned.split_whitespace().enumerate() {
            if char_len(token) <= 2 || STOPWORDS.contains(&token) {
                continue;
            }
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

        ranked
            .into_iter()
            .take(KEYWORD_LIMIT)
            .map(|(token, _)| token.to_string())
            .collect()
    }

    fn categorize(&self, text: &str, file_names: &[String]) -> Vec<String> {
        let mut categories: Vec<String> = self
            .category_rules
            .iter()
            .filter(|(_, pattern)| pattern.is_match(text))
            .map(|(label, _)| label.to_string())
            .collect();

        let kinds: Vec<DocumentKind> = file_names
            .iter()
            .filter_map(|name| DocumentKind::from_file_name(name))
            .collect();

        if kinds.contains(&DocumentKind::Image) {
            categories.push("Scanned Images (OCR)".to_string());
        }
        if kinds.contains(&DocumentKind::Spreadsheet) {
            categories.push("Spreadsheets & Tabular Data".to_string());
        }

        categories
    }

    fn matching_sentences(&self, text: &str, patterns: &[Regex]) -> Vec<String> {
        let mut seen = HashSet::new();
        split_sentences(text)
            .into_iter()
            .filter(|s| LISTED_SENTENCE_CHARS.contains(&char_len(s)))
            .filter(|s| patterns.iter().any(|p| p.is_match(s)))
            .filter(|s| seen.insert(s.clone()))
            .take(MAX_LISTED_ITEMS)
            .collect()
    }

    fn relationships(
        &self,
        text: &str,
        sections: &[(String, String)],
        file_names: &[String],
    ) -> Vec<String> {
        let mut relationships = Vec::new();

        if file_names.len() <= 1 {
            relationships
                .push("Single document analyzed; no cross-document relationships.".to_string());
        } else {
            relationships.push(format!(
                "{} documents were analyzed together as one collection.",
                file_names.len()
            ));

            let mut formats: BTreeMap<String, usize> = BTreeMap::new();
            for name in file_names {
                let ext = name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
                    .unwrap_or_else(|| "unknown".to_string());
                *formats.entry(ext).or_default() += 1;
            }
            let formats: Vec<String> = formats
                .iter()
                .map(|(ext, count)| format!("{} ({})", ext, count))
                .collect();
            relationships.push(format!("File formats: {}", formats.join(", ")));

            relationships.extend(self.shared_topics(sections));
        }

        if self.cross_reference_pattern.is_match(text) {
            relationships.push(
                "The documents refer to other material (citations or cross-references detected)."
                    .to_string(),
            );
        }

        relationships
    }

    /// Pairs of files whose top keywords overlap.
    fn shared_topics(&self, sections: &[(String, String)]) -> Vec<String> {
        let keyword_sets: Vec<(&str, Vec<String>)> = sections
            .iter()
            .map(|(name, body)| {
                let mut keywords = self.extract_keywords(body);
                keywords.truncate(10);
                (name.as_str(), keywords)
            })
            .collect();

        let mut out = Vec::new();
        for (i, (first, first_keywords)) in keyword_sets.iter().enumerate() {
            for (second, second_keywords) in keyword_sets.iter().skip(i + 1) {
                let shared: Vec<&str> = first_keywords
                    .iter()
                    .filter(|k| second_keywords.contains(k))
                    .map(String::as_str)
                    .take(5)
                    .collect();
                if !shared.is_empty() {
                    out.push(format!(
                        "{} and {} share topics: {}",
                        first,
                        second,
                        shared.join(", ")
                    ));
                }
                if out.len() >= MAX_SHARED_TOPIC_PAIRS {
                    return out;
                }
            }
        }
        out
    }
}
