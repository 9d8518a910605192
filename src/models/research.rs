use serde::{Deserialize, Serialize};

/// Keywords marking a line as describing a pattern or trend
const PATTERN_KEYWORDS: &[&str] = &["패턴", "트렌드", "경향"];
/// Keywords marking a line as a conclusion or implication
const CONCLUSION_KEYWORDS: &[&str] = &["결론", "시사점", "의미"];

const MIN_INSIGHT_LINE_CHARS: usize = 10;
const MAX_INSIGHT_LINES: usize = 5;

/// Supplementary context injected into prompts. May be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchBundle {
    pub raw_text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ResearchBundle {
    /// Build a bundle from free text, collecting any URLs it mentions as sources
    pub fn from_text(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let mut sources: Vec<String> = Vec::new();
        for word in raw_text.split_whitespace() {
            let word = word.trim_matches(|c: char| matches!(c, '(' | ')' | '<' | '>' | '"' | ','));
            if (word.starts_with("http://") || word.starts_with("https://"))
                && !sources.iter().any(|s| s == word)
            {
                sources.push(word.to_string());
            }
        }
        Self { raw_text, sources }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    /// Lines of the research that describe patterns or trends
    pub fn patterns(&self) -> Vec<String> {
        extract_patterns(&self.raw_text)
    }

    /// Lines of the research that state conclusions or implications
    pub fn conclusions(&self) -> Vec<String> {
        extract_conclusions(&self.raw_text)
    }
}

/// Collect up to five lines mentioning a pattern, trend or tendency
pub fn extract_patterns(text: &str) -> Vec<String> {
    lines_with_keywords(text, PATTERN_KEYWORDS)
}

/// Collect up to five lines mentioning a conclusion or implication
pub fn extract_conclusions(text: &str) -> Vec<String> {
    lines_with_keywords(text, CONCLUSION_KEYWORDS)
}

fn lines_with_keywords(text: &str, keywords: &[&str]) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_INSIGHT_LINE_CHARS)
        .filter(|line| keywords.iter().any(|k| line.contains(k)))
        .take(MAX_INSIGHT_LINES)
        .map(str::to_string)
        .collect()
}
