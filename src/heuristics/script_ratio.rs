use super::text::{count_hangul, count_non_whitespace};
use super::{CheckResult, RelaxedGateConfig, QualityConfig};

pub const SCRIPT_RATIO: &str = "script_ratio";

/// Check that the text carries enough Hangul, both absolutely and relative to
/// all non-whitespace characters.
///
/// Expects text with fenced code already removed.
pub fn check_script_ratio(text: &str, min_chars: usize, min_ratio: f64) -> CheckResult {
    let script_chars = count_hangul(text);
    let non_ws = count_non_whitespace(text);
    let ratio = if non_ws > 0 {
        script_chars as f64 / non_ws as f64
    } else {
        0.0
    };

    let passed = non_ws > 0 && script_chars >= min_chars && ratio >= min_ratio;

    CheckResult {
        name: SCRIPT_RATIO,
        passed,
        metrics: vec![
            ("script_chars", script_chars as f64),
            ("non_whitespace_chars", non_ws as f64),
            ("script_ratio", ratio),
        ],
    }
}

pub(crate) fn check_full(text: &str, config: &QualityConfig) -> CheckResult {
    check_script_ratio(text, config.min_script_chars, config.min_script_ratio)
}

pub(crate) fn check_relaxed(text: &str, config: &RelaxedGateConfig) -> CheckResult {
    check_script_ratio(text, config.min_script_chars, config.min_script_ratio)
}
