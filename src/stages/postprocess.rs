//! Normalization applied to every stage output.
//!
//! Strips emoji and rewrites prose sentence endings to the `~다.` form while
//! leaving markdown structure (headers, lists, quotes, tables, footnotes and
//! fenced code) exactly as generated.

use std::sync::LazyLock;

use regex::Regex;

use crate::heuristics::{
    CodeRegion, FenceTracker, is_blockquote, is_emoji, is_fence, is_hangul, is_heading,
    is_list_item,
};

/// Required terminal form
pub const TERMINAL_FORM: &str = "다.";

/// Prose lines longer than this (in characters) get `다.` appended when they
/// end without any recognizable terminal punctuation
pub const MIN_APPEND_CHARS: usize = 10;

/// Polite-register endings and their `~다.` replacements, longest first
const POLITE_SUFFIXES: &[(&str, &str)] = &[
    ("아니에요.", "아니다."),
    ("이에요.", "이다."),
    ("었어요.", "었다."),
    ("았어요.", "았다."),
    ("였어요.", "였다."),
    ("했어요.", "했다."),
    ("에요.", "이다."),
    ("예요.", "다."),
    ("어요.", "다."),
    ("요.", "다."),
];

/// Characters that already close a sentence or a markup construct
const TERMINAL_PUNCTUATION: &[char] = &[
    '.', '!', '?', ':', ';', '…', '"', '\'', '”', '’', ')', ']', '}', '`', '*', '|', '。',
];

/// Hangul syllables that already close a sentence in the target style
const CLOSING_SYLLABLES: &[char] = &['다', '했', '였', '임', '음', '함'];

// Section labels the digest prompt asks for; a `다.` on them reads as "리스크다."
static DIGEST_GUIDE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"무엇이 새로웠나|영향 경로|리스크.*관찰 포인트").expect("valid guide phrase regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading,
    ListItem,
    Blockquote,
    Table,
    Footnote,
    GuidePhrase,
    Fence,
    Prose,
}

/// Digest section label that must keep its noun ending
pub fn is_digest_guide_phrase(line: &str) -> bool {
    DIGEST_GUIDE_PHRASE.is_match(line)
}

pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|&c| !is_emoji(c)).collect()
}

/// Normalize generated text. Total and idempotent.
pub fn normalize(text: &str) -> String {
    let mut fences = FenceTracker::default();
    let mut out: Vec<String> = Vec::new();

    for raw in text.split('\n') {
        // Code content is kept byte for byte, including emoji
        if fences.is_open() {
            fences.classify(raw);
            out.push(raw.to_string());
            continue;
        }

        let line = strip_emoji(raw);
        if fences.classify(&line) == CodeRegion::Fence {
            out.push(line);
            continue;
        }
        match classify(&line) {
            LineKind::Prose => out.push(normalize_prose_line(&line)),
            _ => out.push(line),
        }
    }

    out.join("\n")
}

fn classify(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    if is_fence(trimmed) {
        LineKind::Fence
    } else if is_heading(trimmed) {
        LineKind::Heading
    } else if is_list_item(trimmed) {
        LineKind::ListItem
    } else if is_blockquote(trimmed) {
        LineKind::Blockquote
    } else if trimmed.starts_with('|') {
        LineKind::Table
    } else if trimmed.starts_with("[^") {
        LineKind::Footnote
    } else if is_digest_guide_phrase(trimmed) {
        LineKind::GuidePhrase
    } else {
        LineKind::Prose
    }
}

/// Rewrite the ending of one prose line
fn normalize_prose_line(line: &str) -> String {
    let body = line.trim_end();
    if body.trim_start().is_empty() || body.ends_with(TERMINAL_FORM) {
        return line.to_string();
    }

    for &(suffix, replacement) in POLITE_SUFFIXES {
        if let Some(stem) = body.strip_suffix(suffix) {
            return format!("{}{}", stem, replacement);
        }
    }

    if has_terminal_ending(body) {
        return line.to_string();
    }

    if body.trim_start().chars().count() > MIN_APPEND_CHARS {
        format!("{}{}", body, TERMINAL_FORM)
    } else {
        line.to_string()
    }
}

fn has_terminal_ending(body: &str) -> bool {
    match body.chars().last() {
        Some(c) => {
            TERMINAL_PUNCTUATION.contains(&c) || (is_hangul(c) && CLOSING_SYLLABLES.contains(&c))
        }
        None => false,
    }
}
