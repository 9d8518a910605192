//! Pre-publication checks on a finished document.
//!
//! Errors block publication; warnings are logged and the post is still written.

use serde::{Deserialize, Serialize};

use super::{check_terminal_ratio, is_emoji, strip_code_blocks};
use crate::models::FinalDocument;

/// Categories the blog knows how to file
pub const VALID_CATEGORIES: &[&str] = &["daily", "dev", "document", "study"];

/// Thresholds and word list for [`check_document`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentCheckConfig {
    /// Minimum trimmed body length in characters
    pub min_body_chars: usize,
    /// Phrases the style guide bans
    pub forbidden_words: Vec<String>,
    /// Below this share of `~다.` lines a style warning is raised
    pub min_terminal_ratio: f64,
}

impl Default for DocumentCheckConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 800,
            forbidden_words: [
                "안녕하세요",
                "반갑습니다",
                "오늘은",
                "매우",
                "획기적인",
                "놀라운",
                "결론적으로",
                "요약하자면",
                "마지막으로",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            min_terminal_ratio: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DocumentReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn check_document(document: &FinalDocument, config: &DocumentCheckConfig) -> DocumentReport {
    let mut report = DocumentReport::default();
    let body = document.body.trim();

    if document.title.trim().is_empty() {
        report.errors.push("missing title".to_string());
    }

    let body_chars = body.chars().count();
    if body_chars < config.min_body_chars {
        report.errors.push(format!(
            "body too short: {} chars (minimum {})",
            body_chars, config.min_body_chars
        ));
    }

    if !VALID_CATEGORIES.contains(&document.category.as_str()) {
        report
            .errors
            .push(format!("invalid category: {:?}", document.category));
    }

    let prose = strip_code_blocks(body);
    let lowered = prose.to_lowercase();
    for word in &config.forbidden_words {
        if lowered.contains(word.as_str()) {
            report.warnings.push(format!("forbidden phrase: {}", word));
        }
    }

    if prose.chars().any(is_emoji) {
        report.warnings.push("emoji left in body".to_string());
    }

    let terminal = check_terminal_ratio(&prose, config.min_terminal_ratio, 10);
    if !terminal.passed {
        report.warnings.push(format!(
            "few lines end in ~다. (ratio {:.2})",
            terminal.metric("terminal_ratio").unwrap_or_default()
        ));
    }

    if body.contains("[^") && !body.contains("## References") {
        report
            .warnings
            .push("footnote markers without a References section".to_string());
    }

    report
}
