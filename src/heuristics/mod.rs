//! Surface heuristics deciding whether generated text is a usable Korean post.
//!
//! Each heuristic is a small pure function over plain text so thresholds can be
//! tuned and tested in isolation. [`validate`] runs all of them and reports every
//! failure; [`validate_relaxed`] is the weaker gate used for last-resort output.

pub mod document;
pub mod language_switch;
pub mod script_ratio;
pub mod terminal_ratio;
pub mod text;

pub use document::*;
pub use language_switch::*;
pub use script_ratio::*;
pub use terminal_ratio::*;
pub use text::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Verdict;

pub const EMPTY: &str = "empty";
pub const MIN_LENGTH: &str = "min_length";

/// Thresholds for the full quality gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Minimum number of Hangul characters outside code blocks
    pub min_script_chars: usize,
    /// Minimum Hangul share of non-whitespace characters
    pub min_script_ratio: f64,
    /// Minimum share of prose lines ending in `~다.`
    pub min_terminal_ratio: f64,
    /// Lines shorter than this are ignored by the terminal-ratio check
    pub min_terminal_line_chars: usize,
    /// Floor for the quarter size used by the language-switch check
    pub min_quarter_chars: usize,
    /// Minimum Hangul characters in the last quarter of the text
    pub min_last_quarter_script_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_script_chars: 150,
            min_script_ratio: 0.20,
            min_terminal_ratio: 0.50,
            min_terminal_line_chars: 10,
            min_quarter_chars: 100,
            min_last_quarter_script_chars: 20,
        }
    }
}

/// Thresholds for the relaxed gate applied to legacy fallback output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxedGateConfig {
    /// Minimum length of the whole text in characters
    pub min_length: usize,
    pub min_script_chars: usize,
    pub min_script_ratio: f64,
}

impl Default for RelaxedGateConfig {
    fn default() -> Self {
        Self {
            min_length: 500,
            min_script_chars: 100,
            min_script_ratio: 0.15,
        }
    }
}

/// Outcome of one heuristic
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Reason name reported when the check fails
    pub name: &'static str,
    pub passed: bool,
    pub metrics: Vec<(&'static str, f64)>,
}

impl CheckResult {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// Run every heuristic of the full gate.
///
/// Empty or missing input is rejected with reason `empty` before any check runs.
pub fn validate<'a>(text: impl Into<Option<&'a str>>, config: &QualityConfig) -> Verdict {
    let Some(text) = text.into().filter(|t| !t.trim().is_empty()) else {
        return Verdict::rejected(EMPTY);
    };

    let stripped = strip_code_blocks(text);

    combine(vec![
        script_ratio::check_full(&stripped, config),
        check_terminal_ratio(
            &stripped,
            config.min_terminal_ratio,
            config.min_terminal_line_chars,
        ),
        check_language_switch(
            &stripped,
            config.min_quarter_chars,
            config.min_last_quarter_script_chars,
        ),
    ])
}

/// Length plus script-ratio only; terminal and positional checks are skipped
pub fn validate_relaxed<'a>(
    text: impl Into<Option<&'a str>>,
    config: &RelaxedGateConfig,
) -> Verdict {
    let Some(text) = text.into().filter(|t| !t.trim().is_empty()) else {
        return Verdict::rejected(EMPTY);
    };

    let length = text.trim().chars().count();
    let length_check = CheckResult {
        name: MIN_LENGTH,
        passed: length >= config.min_length,
        metrics: vec![("length", length as f64)],
    };

    let stripped = strip_code_blocks(text);
    combine(vec![length_check, script_ratio::check_relaxed(&stripped, config)])
}

fn combine(checks: Vec<CheckResult>) -> Verdict {
    let mut reasons = Vec::new();
    let mut metrics = BTreeMap::new();

    for check in checks {
        if !check.passed {
            reasons.push(check.name.to_string());
        }
        for (name, value) in check.metrics {
            metrics.insert(name.to_string(), value);
        }
    }

    Verdict {
        accepted: reasons.is_empty(),
        reasons,
        metrics,
    }
}
