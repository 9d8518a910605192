use super::CheckResult;
use super::text::count_hangul;

pub const LANGUAGE_SWITCH: &str = "language_switch";

/// Detect output that starts in Korean and drifts into another language.
///
/// The text is cut into a first and last quarter by character count, each at
/// least `min_quarter_chars` long (capped at the text length). The last quarter
/// must still hold `min_last_quarter_script_chars` Hangul characters.
pub fn check_language_switch(
    text: &str,
    min_quarter_chars: usize,
    min_last_quarter_script_chars: usize,
) -> CheckResult {
    let chars: Vec<char> = text.chars().collect();
    let length = chars.len();

    if length == 0 {
        return CheckResult {
            name: LANGUAGE_SWITCH,
            passed: true,
            metrics: vec![("length", 0.0)],
        };
    }

    let quarter = (length / 4).max(min_quarter_chars).min(length);
    let first: String = chars[..quarter].iter().collect();
    let last: String = chars[length - quarter..].iter().collect();

    let first_count = count_hangul(&first);
    let last_count = count_hangul(&last);

    CheckResult {
        name: LANGUAGE_SWITCH,
        passed: last_count >= min_last_quarter_script_chars,
        metrics: vec![
            ("length", length as f64),
            ("first_quarter_script_chars", first_count as f64),
            ("last_quarter_script_chars", last_count as f64),
        ],
    }
}
