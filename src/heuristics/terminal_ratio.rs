use std::sync::LazyLock;

use regex::Regex;

use super::CheckResult;
use super::text::{is_heading, is_list_item};

pub const TERMINAL_RATIO: &str = "terminal_ratio";

// `다.` with an optional footnote marker such as `다[^1].` or `다 [2].`
static TERMINAL_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"다\s*(?:\[[^\]]*\])?\.$").expect("valid terminal form regex"));

/// Whether a trimmed line ends with the required `~다.` form
pub fn ends_with_terminal_form(line: &str) -> bool {
    TERMINAL_FORM.is_match(line.trim_end())
}

/// Check the share of prose lines that end with `~다.`.
///
/// Only lines of at least `min_line_chars` characters that are neither headings
/// nor list items count. With no qualifying lines the check passes.
pub fn check_terminal_ratio(text: &str, min_ratio: f64, min_line_chars: usize) -> CheckResult {
    let mut qualifying = 0usize;
    let mut matching = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.chars().count() < min_line_chars || is_heading(line) || is_list_item(line) {
            continue;
        }
        qualifying += 1;
        if ends_with_terminal_form(line) {
            matching += 1;
        }
    }

    let (ratio, passed) = if qualifying == 0 {
        (1.0, true)
    } else {
        let ratio = matching as f64 / qualifying as f64;
        (ratio, ratio >= min_ratio)
    };

    CheckResult {
        name: TERMINAL_RATIO,
        passed,
        metrics: vec![
            ("terminal_lines", qualifying as f64),
            ("terminal_matches", matching as f64),
            ("terminal_ratio", ratio),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(correct: usize, total: usize) -> String {
        (0..total)
            .map(|i| {
                if i < correct {
                    format!("{}번째 문장은 규칙을 지킨다.", i)
                } else {
                    format!("{}번째 문장은 규칙을 어겼어요", i)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_terminal_form_variants() {
        assert!(ends_with_terminal_form("결과가 확인되었다."));
        assert!(ends_with_terminal_form("출처가 있다[^1]."));
        assert!(ends_with_terminal_form("출처가 있다 [2]."));
        assert!(!ends_with_terminal_form("결과가 확인되었습니까?"));
        assert!(!ends_with_terminal_form("결과가 확인되었다"));
        assert!(!ends_with_terminal_form("결과가 좋아요."));
    }

    #[test]
    fn test_half_of_lines_passes() {
        let result = check_terminal_ratio(&prose(5, 10), 0.5, 10);

        assert!(result.passed);
        assert_eq!(result.metric("terminal_lines"), Some(10.0));
        assert_eq!(result.metric("terminal_ratio"), Some(0.5));
    }

    #[test]
    fn test_four_of_ten_fails() {
        let result = check_terminal_ratio(&prose(4, 10), 0.5, 10);

        assert!(!result.passed);
        assert_eq!(result.metric("terminal_matches"), Some(4.0));
    }

    #[test]
    fn test_headings_lists_and_short_lines_ignored() {
        let text = "## 이 제목은 검사 대상에서 빠진다\n- 이 항목도 검사 대상에서 빠진다\n짧은 줄\n이 문장은 검사 대상이다.";
        let result = check_terminal_ratio(text, 0.5, 10);

        assert_eq!(result.metric("terminal_lines"), Some(1.0));
        assert!(result.passed);
    }

    #[test]
    fn test_no_qualifying_lines_passes() {
        let result = check_terminal_ratio("# 제목\n- 항목", 0.5, 10);

        assert!(result.passed);
        assert_eq!(result.metric("terminal_lines"), Some(0.0));
    }
}
