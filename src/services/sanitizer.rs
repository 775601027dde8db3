//! Post-processing for raw model output.
//!
//! All cleanup is one ordered table of `(pattern, replacement, scope)` rules.
//! A pass applies every rule in order; passes repeat until the text stops
//! changing, which is what makes `sanitize` idempotent. No rule lengthens the
//! text, so the loop ends.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every match in the text.
    Everywhere,
    /// Only a match anchored at the very start of the text.
    TextStart,
}

pub struct Rule {
    pub pattern: &'static str,
    pub replacement: &'static str,
    pub scope: Scope,
}

/// Clauses models like to open with. Matched case-insensitively, up to and
/// including the first colon or line break.
pub const BOILERPLATE_PREFIXES: &[&str] = &[
    "chapter",
    "section",
    "here is",
    "certainly",
    "sure",
    "based on",
    "i will",
    "i suggest",
    "in this chapter",
];

const BOILERPLATE_PATTERN: &str = r"(?i)^(?:chapter|section|here is|certainly|sure|based on|i will|i suggest|in this chapter)\b[^:\n]*[:\n]";

pub const RULES: &[Rule] = &[
    Rule { pattern: r"\r\n?", replacement: "\n", scope: Scope::Everywhere },
    // horizontal rules only when they are the whole line
    Rule {
        pattern: r"(?m)^[ \t]*(?:-{3,}|_{3,}|\*{3,}|={3,}|~{3,})[ \t]*$",
        replacement: "",
        scope: Scope::Everywhere,
    },
    // star bullets become dash bullets so the list survives star removal
    Rule { pattern: r"(?m)^([ \t]*)\*[ \t]+", replacement: "$1- ", scope: Scope::Everywhere },
    // emphasis stars
    Rule { pattern: r"\*+", replacement: "", scope: Scope::Everywhere },
    // __bold__; underscore runs that wrap nothing are fill-in blanks
    Rule { pattern: r"__([^_\s][^_]*?)__", replacement: "$1", scope: Scope::Everywhere },
    // dash or equals runs inside a line separate words
    Rule { pattern: r"-{3,}|={3,}|~{3,}", replacement: " ", scope: Scope::Everywhere },
    // heading hashes; a hash glued to a word (#hashtag) is prose
    Rule { pattern: r"(?m)(^|[ \t])#+([ \t]|$)", replacement: "$1$2", scope: Scope::Everywhere },
    Rule { pattern: r"[ \t]{2,}|\t", replacement: " ", scope: Scope::Everywhere },
    Rule { pattern: r"(?m)^[ \t]+|[ \t]+$", replacement: "", scope: Scope::Everywhere },
    Rule { pattern: r"\n{3,}", replacement: "\n\n", scope: Scope::Everywhere },
    Rule { pattern: r"^\s+", replacement: "", scope: Scope::TextStart },
    Rule { pattern: BOILERPLATE_PATTERN, replacement: "", scope: Scope::TextStart },
    Rule { pattern: r"^\s+|\s+$", replacement: "", scope: Scope::Everywhere },
];

static BOILERPLATE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(BOILERPLATE_PATTERN).ok());

static COMPILED: LazyLock<Vec<(Regex, &'static Rule)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|rule| match Regex::new(rule.pattern) {
            Ok(regex) => Some((regex, rule)),
            Err(e) => {
                tracing::error!("sanitizer rule {:?} does not compile: {}", rule.pattern, e);
                None
            }
        })
        .collect()
});

fn apply_pass(text: &str) -> String {
    let mut current = text.to_string();
    for (regex, rule) in COMPILED.iter() {
        let next = match rule.scope {
            Scope::Everywhere => regex.replace_all(&current, rule.replacement),
            Scope::TextStart => regex.replace(&current, rule.replacement),
        };
        if next != current {
            current = next.into_owned();
        }
    }
    current
}

/// Normalizes raw generated text. Never fails; empty in, empty out.
pub fn sanitize(raw: &str) -> String {
    let mut current = apply_pass(raw);
    loop {
        let next = apply_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Sanitizes text that may be absent. `None` when nothing is left.
pub fn sanitize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(sanitize).filter(|text| !text.is_empty())
}

/// True when the first line still opens with one of the boilerplate clauses.
pub fn has_boilerplate_prefix(text: &str) -> bool {
    let first_line = text.trim_start().split_inclusive('\n').next().unwrap_or_default();
    BOILERPLATE
        .as_ref()
        .is_some_and(|regex| regex.is_match(first_line))
}
