//! Sentence and character helpers shared by the analyzer and the card-note
//! pipeline. All lengths are counted in chars, never bytes, because most
//! uploaded material mixes Han and Latin text.

use regex::Regex;
use std::sync::OnceLock;

fn sentence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^.!?。！？\n]+[.!?。！？]*").unwrap())
}

/// Split text into trimmed, non-empty sentences. Terminators stay attached.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max` chars of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
