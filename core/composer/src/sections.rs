//! Locates the fixed report sections written by the analyzer.
//!
//! Header wording is a contract with the report renderer in the ingestion
//! crate: renaming a heading there silently empties the concept stages here.

use docnote_schemas::text::split_sentences;

pub const SMART_SUMMARY_HEADERS: &[&str] = &["Smart Summary", "智能摘要"];
pub const CORE_KEYWORDS_HEADERS: &[&str] = &["Core Keywords", "核心关键词"];

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('#')
        || (trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**"))
}

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-' || c == '=' || c == '*')
}

/// Body text under the first heading matching any of `headers`, up to the
/// next heading or horizontal rule. `None` when missing or blank.
pub fn section_body(summary: &str, headers: &[&str]) -> Option<String> {
    let mut lines = summary.lines();

    lines.by_ref().find(|line| {
        is_heading(line)
            && headers
                .iter()
                .any(|h| line.to_lowercase().contains(&h.to_lowercase()))
    })?;

    let body: Vec<&str> = lines
        .take_while(|line| !is_heading(line) && !is_rule(line))
        .collect();

    let body = body.join("\n").trim().to_string();
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

pub fn smart_summary(summary: &str) -> Option<String> {
    section_body(summary, SMART_SUMMARY_HEADERS)
}

pub fn core_keywords(summary: &str) -> Option<String> {
    section_body(summary, CORE_KEYWORDS_HEADERS)
}

/// Summary with headings, rules, label lines and attribution lines removed.
/// List bullets are unwrapped so their text reads as prose.
pub fn strip_boilerplate(summary: &str) -> String {
    summary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_heading(line) && !is_rule(line))
        .filter(|line| !line.starts_with("**"))
        .filter(|line| !(line.starts_with('*') && line.ends_with('*')))
        .map(|line| line.trim_start_matches(['-', '*', '•']).trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text the card stages search for explanations and examples: both report
/// sections, or the de-boilerplated summary when neither exists.
pub fn relevant_content(summary: &str) -> String {
    let parts: Vec<String> = [smart_summary(summary), core_keywords(summary)]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        strip_boilerplate(summary)
    } else {
        parts.join("\n")
    }
}

/// Sentences of `relevant_content`.
pub fn relevant_sentences(summary: &str) -> Vec<String> {
    split_sentences(&relevant_content(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "# Document Analysis Report\n\n\
        **Files analyzed:** 1 (notes.txt)\n\n\
        ## Smart Summary\n\n\
        The team discussed the key risks of the migration.\n\n\
        ## Core Keywords\n\n\
        migration, risk, database\n\n\
        ## Key Points\n\
        - Migration must finish by June\n\n\
        ---\n\
        *Summary generated by local heuristic analysis*\n";

    #[test]
    fn test_section_body_stops_at_next_heading() {
        assert_eq!(
            smart_summary(REPORT).as_deref(),
            Some("The team discussed the key risks of the migration.")
        );
        assert_eq!(core_keywords(REPORT).as_deref(), Some("migration, risk, database"));
    }

    #[test]
    fn test_section_body_missing_or_blank() {
        assert!(smart_summary("no headings here").is_none());
        assert!(smart_summary("## Smart Summary\n\n## Core Keywords\nfoo").is_none());
    }

    #[test]
    fn test_chinese_headers_are_recognized() {
        let report = "## 智能摘要\n本文讨论了关键问题。\n## 核心关键词\n数据, 模型";
        assert_eq!(smart_summary(report).as_deref(), Some("本文讨论了关键问题。"));
        assert_eq!(core_keywords(report).as_deref(), Some("数据, 模型"));
    }

    #[test]
    fn test_strip_boilerplate() {
        let stripped = strip_boilerplate(REPORT);
        assert!(!stripped.contains('#'));
        assert!(!stripped.contains("Files analyzed"));
        assert!(!stripped.contains("Summary generated by"));
        assert!(stripped.contains("Migration must finish by June"));
    }

    #[test]
    fn test_relevant_content_falls_back_to_stripped_summary() {
        let plain = "Just some edited prose about compilers.\n---\n";
        assert_eq!(relevant_content(plain), "Just some edited prose about compilers.");
    }
}
