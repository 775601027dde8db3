//! Pulls list items out of model replies: suggested chapter titles, ad hooks.

use crate::services::sanitizer::sanitize;
use regex::Regex;
use std::sync::LazyLock;

static ITEM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    // Common list shapes a model answers with
    let patterns = [
        r"(?i)^\s*chapter\s+(?:\d+|[a-z]+)\s*[:.\-–—]\s*(.+)$", // Chapter 1: Title, Chapter One - Title
        r"(?i)^\s*part\s+(?:\d+|[a-z]+)\s*[:.\-–—]\s*(.+)$",    // Part 2 - Title
        r"^\s*\d+\s*[.):]\s*(.+)$",                             // 1. Title, 1) Title
        r"^\s*\(\d+\)\s*(.+)$",                                 // (1) Title
        r"^\s*[-*•]\s+(.+)$",                                   // - Title
    ];

    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Returns the text of every list item in `reply`, cleaned up.
///
/// Lines that do not look like list items are ignored, so a chatty preamble or
/// sign-off never ends up as an item.
pub fn parse_list_items(reply: &str) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| {
            ITEM_PATTERNS
                .iter()
                .find_map(|regex| regex.captures(line))
                .and_then(|captures| captures.get(1))
                .map(|item| clean_item(item.as_str()))
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// At most `wanted` items from a reply that was asked to be a list. Falls back
/// to any non-empty lines when the reply is not a list at all.
pub fn parse_items(reply: &str, wanted: usize) -> Vec<String> {
    let mut items = parse_list_items(reply);
    if items.is_empty() {
        items = reply
            .lines()
            .map(clean_item)
            .filter(|line| !line.is_empty() && !line.ends_with(':'))
            .collect();
    }
    items.truncate(wanted);
    items
}

fn clean_item(raw: &str) -> String {
    let cleaned = sanitize(raw);
    cleaned
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
        .to_string()
}

/// Numbered outline handed to every chapter prompt.
pub fn format_outline(titles: &[String]) -> String {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n")
}
